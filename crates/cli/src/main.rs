//! # MKLHS センサークライアント CLI
//!
//! 設定されたイテレーション数だけ署名パイプラインを回す
//! エントリポイント。
//!
//! ## 実行フロー
//! 1. 引数解析とトレーシング初期化
//! 2. （任意）`/ping` による死活確認
//! 3. イテレーションごとに 構築 → 署名 → エンコード → 組み立て → 送信
//! 4. 失敗したイテレーションはログに残して次へ進む
//!
//! イテレーション内の失敗はプロセスを止めない。死活確認の失敗のみ
//! 起動エラーとして扱う。

use clap::{Parser, ValueEnum};

use mklhs_client::{
    ClientError, KeyLifetime, Pipeline, PipelineConfig, SubmitMode, TicketPolicy,
};
use mklhs_transport::{HttpTransport, RawSocketTransport, Transport};
use mklhs_types::{Label, ValuePolicy};

/// トランスポート戦略の選択。
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransportKind {
    /// HTTPクライアントライブラリ（reqwest）に委譲する
    Http,
    /// TCPソケット上でHTTP/1.1を手組みする
    Socket,
}

/// 提出モードの選択。
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeKind {
    /// 署名付き提出（`/new`）
    Signed,
    /// ベースライン提出（`/raw`）
    Raw,
}

/// 鍵存続期間の選択。
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KeyLifetimeKind {
    /// セッションで1回生成する
    Session,
    /// イテレーションごとに再生成する
    Iteration,
}

/// チケットポリシーの選択。
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TicketKind {
    /// チケットを付けない
    Omit,
    /// リクエストごとに生成する
    PerRequest,
    /// セッションで1回生成し再利用する
    Session,
}

/// ラベル付き準同型署名付きでセンサーバッチを送信するクライアント。
#[derive(Debug, Parser)]
#[command(name = "mklhs-cli", version, about)]
struct Args {
    /// サーバーホスト
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// サーバーポート
    #[arg(long, default_value_t = 12345)]
    port: u16,

    /// トランスポート戦略
    #[arg(long, value_enum, default_value_t = TransportKind::Http)]
    transport: TransportKind,

    /// イテレーション数
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// バッチあたりのデータポイント数
    #[arg(long, default_value_t = 30)]
    batch_size: usize,

    /// データセット識別子
    #[arg(long, default_value = "test.db")]
    data_set_id: String,

    /// デバイス識別子
    #[arg(long, default_value = "12345")]
    device_id: String,

    /// 提出モード
    #[arg(long, value_enum, default_value_t = ModeKind::Signed)]
    mode: ModeKind,

    /// 署名が後に検証される線形関数の識別子
    #[arg(long, default_value = "doubling")]
    function: String,

    /// 検証委譲チケットのポリシー
    #[arg(long, value_enum, default_value_t = TicketKind::PerRequest)]
    ticket: TicketKind,

    /// 鍵ペアの存続期間
    #[arg(long, value_enum, default_value_t = KeyLifetimeKind::Session)]
    key_lifetime: KeyLifetimeKind,

    /// 整数値の下限（含む）
    #[arg(long, default_value_t = 2)]
    value_min: u64,

    /// 整数値の上限（含まない）
    #[arg(long, default_value_t = 40)]
    value_max: u64,

    /// 浮動小数点サンプリングを使う場合のドメイン上限
    #[arg(long)]
    float_domain: Option<f64>,

    /// 浮動小数点値の整数化スケール
    #[arg(long, default_value_t = 100)]
    scale: u64,

    /// 起動時に死活確認を行う
    #[arg(long, default_value_t = false)]
    ping: bool,
}

impl Args {
    fn value_policy(&self) -> ValuePolicy {
        match self.float_domain {
            Some(domain) => ValuePolicy::Float { domain, scale: self.scale },
            None => ValuePolicy::Integer { min: self.value_min, max: self.value_max },
        }
    }

    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let label = Label::new(self.data_set_id.clone(), self.device_id.clone())?;
        let mode = match self.mode {
            ModeKind::Raw => SubmitMode::Raw,
            ModeKind::Signed => SubmitMode::Signed {
                function: self.function.clone(),
                ticket: match self.ticket {
                    TicketKind::Omit => TicketPolicy::Omit,
                    TicketKind::PerRequest => TicketPolicy::PerRequest,
                    TicketKind::Session => TicketPolicy::Session,
                },
            },
        };
        Ok(PipelineConfig {
            batch_size: self.batch_size,
            value_policy: self.value_policy(),
            label,
            key_lifetime: match self.key_lifetime {
                KeyLifetimeKind::Session => KeyLifetime::Session,
                KeyLifetimeKind::Iteration => KeyLifetime::Iteration,
            },
            mode,
        })
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = args.pipeline_config()?;
    match args.transport {
        TransportKind::Http => {
            let base_url = format!("http://{}:{}", args.host, args.port);
            let transport = HttpTransport::new(base_url)?;
            run(Pipeline::new(config, transport), &args)
        }
        TransportKind::Socket => {
            let transport = RawSocketTransport::new(args.host.clone(), args.port);
            run(Pipeline::new(config, transport), &args)
        }
    }
}

/// イテレーションループ。失敗はイテレーション致命、プロセスは続行する。
fn run<T: Transport>(mut pipeline: Pipeline<T>, args: &Args) -> anyhow::Result<()> {
    if args.ping {
        tracing::info!("サーバーへの死活確認を実行します");
        pipeline.ping().map_err(|e| anyhow::anyhow!("死活確認に失敗しました: {e}"))?;
        tracing::info!("pongを受信しました");
    }

    let mut failures = 0usize;
    for iteration in 0..args.iterations {
        match pipeline.run_iteration() {
            Ok(response) => {
                tracing::info!(
                    iteration,
                    status = response.status,
                    body = %String::from_utf8_lossy(&response.body),
                    "イテレーション完了"
                );
            }
            Err(error) => {
                failures += 1;
                log_iteration_error(iteration, &error);
            }
        }
    }

    if failures > 0 {
        tracing::warn!(failures, total = args.iterations, "一部のイテレーションが失敗しました");
    }
    Ok(())
}

fn log_iteration_error(iteration: usize, error: &ClientError) {
    match error {
        ClientError::Validation(e) => {
            tracing::error!(iteration, "検証エラー（呼び出し側の入力不備）: {e}")
        }
        ClientError::Crypto(e) => tracing::error!(iteration, "暗号処理エラー: {e}"),
        ClientError::Encoding(e) => tracing::error!(iteration, "エンコードエラー: {e}"),
        ClientError::Wire(e) => tracing::error!(iteration, "シリアライズエラー: {e}"),
        ClientError::Transport(e) => tracing::error!(iteration, "トランスポートエラー: {e}"),
    }
}
