//! # MKLHS クライアントパイプライン
//!
//! 1回のイテレーションで、鍵管理 → メッセージ構築 → 署名 →
//! エンコード → （必要なら）委譲チケット事前計算 → ワイヤ文書組み立て
//! → 送信、を厳密に逐次実行する。
//!
//! イテレーション間で共有される可変状態は鍵ペアのみ（存続期間は
//! [`KeyLifetime`] で明示的に選択する）。メッセージ・署名・エンコード
//! 済み文字列・チケット・シリアライズバッファはイテレーションごとに
//! 生成され、次のイテレーション開始前に完全に解放される。
//!
//! エラーはイテレーション致命だがプロセス致命ではない。どの段の失敗も
//! 当該イテレーションのみを中断し、確保済みの資源を解放して次の
//! イテレーションへ進む（ループは呼び出し側 `mklhs-cli` が持つ）。

use mklhs_crypto::{generate_ticket, sign_message, CryptoError, EncodingError, KeyPair};
use mklhs_transport::{HttpResponse, Transport, TransportError};
use mklhs_types::{build_message, EncodedTicket, Label, ValidationError, ValuePolicy};
use mklhs_wire::{RawRequest, SignedRequest, WireError};

/// 署名付き提出のパス。
pub const SIGNED_PATH: &str = "/new";
/// ベースライン提出のパス。
pub const RAW_PATH: &str = "/raw";

/// パイプラインのエラー型。各段のエラーを集約する。
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// 暗号処理の失敗（鍵生成・署名・チケット生成）
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// メッセージ構築の検証失敗
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// エンコード失敗
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// ワイヤ文書のシリアライズ失敗
    #[error(transparent)]
    Wire(#[from] WireError),
    /// 送受信の失敗
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// 鍵ペアの存続期間。
///
/// どちらを選ぶかで性能と「1つの鍵が多数のメッセージに署名する」という
/// 準同型スキームの意味の両方が変わるため、既定値を仮定せず明示的な
/// 設定とする。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLifetime {
    /// セッション開始時に1回生成し、全イテレーションで再利用する
    Session,
    /// イテレーションごとに再生成する
    Iteration,
}

/// 検証委譲チケットのポリシー。
///
/// チケットはメッセージ内容と独立で数学的には再利用可能だが、参照実装の
/// 挙動はリクエストごとの再生成である。意図的な選択として公開する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketPolicy {
    /// チケットを付けない
    Omit,
    /// リクエストごとに新しいチケットを生成する（参照挙動）
    PerRequest,
    /// セッションで1回生成し、以後のリクエストに再利用する
    Session,
}

/// 提出モード。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitMode {
    /// 署名付き提出（`/new`）
    Signed {
        /// 署名が後に検証される線形関数の識別子
        function: String,
        /// 委譲チケットのポリシー
        ticket: TicketPolicy,
    },
    /// ベースライン提出（`/raw`）。署名・公開鍵・チケットを持たない。
    Raw,
}

/// パイプライン設定。近縁の変種（整数/浮動小数点、署名/無署名、
/// チケット有無、トランスポート選択）はすべてこの構造体の値で表す。
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// バッチあたりのデータポイント数
    pub batch_size: usize,
    /// 値生成ポリシー
    pub value_policy: ValuePolicy,
    /// 共有ラベル
    pub label: Label,
    /// 鍵ペアの存続期間
    pub key_lifetime: KeyLifetime,
    /// 提出モード
    pub mode: SubmitMode,
}

/// 署名・送信パイプライン。
///
/// イテレーション間で保持するのは設定・トランスポート・（存続期間
/// 設定に応じて）鍵ペアとセッションチケットのみ。
pub struct Pipeline<T: Transport> {
    config: PipelineConfig,
    transport: T,
    keys: Option<KeyPair>,
    session_ticket: Option<EncodedTicket>,
}

impl<T: Transport> Pipeline<T> {
    /// 設定とトランスポートからパイプラインを作る。鍵は遅延生成。
    pub fn new(config: PipelineConfig, transport: T) -> Self {
        Self { config, transport, keys: None, session_ticket: None }
    }

    /// サーバーの死活確認。
    pub fn ping(&mut self) -> Result<(), ClientError> {
        Ok(self.transport.ping()?)
    }

    /// 現在保持している鍵ペア。鍵が未生成なら `None`。
    pub fn keys(&self) -> Option<&KeyPair> {
        self.keys.as_ref()
    }

    /// 存続期間設定に従って鍵ペアを返す。
    fn keys_for_iteration(&mut self) -> Result<&KeyPair, ClientError> {
        let regenerate = match self.config.key_lifetime {
            KeyLifetime::Iteration => true,
            KeyLifetime::Session => self.keys.is_none(),
        };
        if regenerate {
            tracing::debug!("鍵ペアを生成します");
            self.keys = Some(KeyPair::generate()?);
        }
        // 直前で必ずSomeにしている
        match self.keys.as_ref() {
            Some(keys) => Ok(keys),
            None => Err(ClientError::Crypto(CryptoError::KeyGen(
                "鍵ペアが初期化されていません".to_string(),
            ))),
        }
    }

    /// チケットポリシーに従ってエンコード済みチケットを用意する。
    fn ticket_for_iteration(
        &mut self,
        policy: TicketPolicy,
    ) -> Result<Option<EncodedTicket>, ClientError> {
        match policy {
            TicketPolicy::Omit => Ok(None),
            TicketPolicy::PerRequest => {
                let ticket = generate_ticket()?.encode()?;
                Ok(Some(ticket))
            }
            TicketPolicy::Session => {
                if self.session_ticket.is_none() {
                    self.session_ticket = Some(generate_ticket()?.encode()?);
                }
                Ok(self.session_ticket.clone())
            }
        }
    }

    /// 1イテレーションを実行し、サーバーのレスポンスを返す。
    ///
    /// どの段の失敗でもイテレーション全体が中断され、途中生成物は
    /// このフレームと共に解放される。部分バッチが送信されることはない。
    pub fn run_iteration(&mut self) -> Result<HttpResponse, ClientError> {
        let message = build_message(
            self.config.batch_size,
            &self.config.value_policy,
            &self.config.label,
        )?;

        match self.config.mode.clone() {
            SubmitMode::Raw => {
                let request = RawRequest { message: &message };
                let document = request.serialize(request.capacity_hint())?;
                tracing::info!(
                    points = message.len(),
                    bytes = document.len(),
                    "ベースライン文書を送信します"
                );
                Ok(self.transport.post(RAW_PATH, &document)?)
            }
            SubmitMode::Signed { function, ticket } => {
                let ticket = self.ticket_for_iteration(ticket)?;
                let keys = self.keys_for_iteration()?;
                let public_key = keys.encode_public_key()?;

                // 逐次署名。1点でも失敗すればバッチ全体が未署名となる。
                let signatures = sign_message(&message, keys)?;
                let (encoded, signature_length) =
                    mklhs_crypto::encode_signatures(&signatures)?;

                let request = SignedRequest {
                    message: &message,
                    signatures: &encoded,
                    signature_length,
                    public_key: &public_key,
                    function: &function,
                    ticket: ticket.as_ref(),
                };
                let document = request.serialize(request.capacity_hint())?;
                tracing::info!(
                    points = message.len(),
                    bytes = document.len(),
                    ticket = ticket.is_some(),
                    "署名付き文書を送信します"
                );
                Ok(self.transport.post(SIGNED_PATH, &document)?)
            }
        }
    }
}
