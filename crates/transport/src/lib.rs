//! # トランスポート層
//!
//! 完成したリクエストバイト列をサーバーへ送り、生のレスポンスを返す。
//! パイプライン本体はどちらの戦略が使われるかに依存しない。
//!
//! ## 戦略
//! - [`HttpTransport`]: 汎用HTTPクライアントライブラリ（reqwest）に委譲
//! - [`RawSocketTransport`]: TCPストリーム上でHTTP/1.1を手組みし、
//!   1回の書き込みで送信してからレスポンスを読む
//!
//! ## 既知のサーバーパス
//! - `/new`  — 署名付きバッチの提出
//! - `/raw`  — ベースライン（無署名）提出
//! - `/ping` — 死活確認（ボディ `pong` を期待）

mod raw;

pub use raw::RawSocketTransport;

/// 死活確認のパス。
pub const PING_PATH: &str = "/ping";
/// 死活確認で期待するボディ。
pub const PONG_BODY: &[u8] = b"pong";

/// トランスポートのエラー型。
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTPクライアントライブラリのエラー
    #[error("HTTPリクエストに失敗しました: {0}")]
    Http(#[from] reqwest::Error),
    /// 接続・送受信のI/Oエラー
    #[error("ソケットI/Oに失敗しました: {0}")]
    Io(#[from] std::io::Error),
    /// レスポンスのフレーミングが不正
    #[error("レスポンスのフレーミングが不正です: {0}")]
    MalformedResponse(String),
    /// 死活確認の失敗（pong以外のボディ）
    #[error("死活確認に失敗しました: ボディ {0:?}")]
    PingFailed(String),
}

/// HTTPレスポンス。ステータスコードとボディ。
#[derive(Debug)]
pub struct HttpResponse {
    /// HTTPステータスコード
    pub status: u16,
    /// レスポンスボディ
    pub body: Vec<u8>,
}

/// トランスポート戦略の境界契約。
///
/// 入力は完成したリクエストバイト列と宛先パス、出力は生のレスポンス。
/// ブロッキングI/Oであり、タイムアウトポリシーは実装側が所有する。
pub trait Transport {
    /// JSONボディをPOSTする。
    fn post(&mut self, path: &str, body: &[u8]) -> Result<HttpResponse, TransportError>;

    /// パスへGETする。
    fn get(&mut self, path: &str) -> Result<HttpResponse, TransportError>;

    /// `/ping` に対する死活確認。ボディが `pong` でなければエラー。
    fn ping(&mut self) -> Result<(), TransportError> {
        let response = self.get(PING_PATH)?;
        if response.body == PONG_BODY {
            Ok(())
        } else {
            Err(TransportError::PingFailed(
                String::from_utf8_lossy(&response.body).into_owned(),
            ))
        }
    }
}

/// reqwestに委譲するトランスポート。
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpTransport {
    /// ベースURL（例: `http://129.242.236.85:12345`）に対する
    /// トランスポートを作る。
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;
        Ok(Self { client, base_url: base_url.into() })
    }
}

impl Transport for HttpTransport {
    fn post(&mut self, path: &str, body: &[u8]) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, bytes = body.len(), "POSTリクエストを送信します");
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body.to_vec())
            .send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        Ok(HttpResponse { status, body })
    }

    fn get(&mut self, path: &str) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
