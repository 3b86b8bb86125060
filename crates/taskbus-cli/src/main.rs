//! taskbus - loopback demo
//!
//! runner を登録し、tokio の channel を bus に見立てて
//! encode → dispatch → reply decode を一通り流します。

mod demo;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use taskbus_core::typed::{RegistryError, Traced};
use taskbus_core::{
    App, AppBuilder, BuildError, BusConfig, CodecError, ConfigError, Decoded, Dispatched, TaskEnvelope,
    WireMessage,
};

use demo::{CHARGE_TASK, ChargeRunner, Money, REFUND_TASK, Receipt, RefundRunner};
use telemetry::{LogFormat, TelemetryError};

/// bus と reply のどちらの channel にも使う容量
const BUS_CAPACITY: usize = 16;

#[derive(Debug, Parser)]
#[command(name = "taskbus", about = "Send typed task envelopes through an in-process bus")]
struct Args {
    /// JSON bus configuration. Defaults apply to anything left out.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t)]
    log_format: LogFormat,

    /// `tracing-subscriber` filter directive, e.g. `taskbus_core=debug`.
    #[arg(long, default_value = "info")]
    log_filter: String,

    #[arg(long, default_value_t = 500)]
    amount: u64,

    #[arg(long, default_value = "USD")]
    currency: String,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("cannot read {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("bus closed before all messages were sent")]
    BusClosed,

    #[error("bus task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("taskbus: {error}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<BusConfig, CliError> {
    let Some(path) = path else {
        return Ok(BusConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
        path: path.clone(),
        source,
    })?;
    Ok(BusConfig::from_json_str(&text)?)
}

async fn run(args: Args) -> Result<(), CliError> {
    telemetry::initialise(&args.log_filter, args.log_format)?;
    let config = load_config(args.config.as_ref())?;

    let app = AppBuilder::new(config)
        .register::<Money, Receipt, _>(CHARGE_TASK, Traced::new(ChargeRunner))?
        .register::<Money, Receipt, _>(REFUND_TASK, RefundRunner)?
        .expect_tasks(&[CHARGE_TASK, REFUND_TASK])
        .build()?;
    info!(task_classes = ?app.registry().task_classes(), "runners registered");

    let codec = app.codec();
    let money = Money {
        amount: args.amount,
        currency: args.currency,
    };
    let outgoing = vec![
        codec.encode(&TaskEnvelope::<Money, Receipt>::request(CHARGE_TASK, money.clone()))?,
        codec.encode(&TaskEnvelope::<Money, Receipt>::request(REFUND_TASK, money.clone()))?,
        codec.encode(&TaskEnvelope::<Money, Receipt>::request("billing.AuditTask", money))?,
        WireMessage::new(b"<ping/>".to_vec()).with_content_type("text/xml"),
    ];

    for reply in loopback(&app, outgoing).await? {
        if let Decoded::Envelope(envelope) = codec.decode(&reply)? {
            let result = envelope.result().map(ToString::to_string).unwrap_or_default();
            println!("{} -> {result}", envelope.task_class().unwrap_or("?"));
        }
    }
    Ok(())
}

/// `outgoing` を bus に流し、dispatcher の reply を送信順に集める。
async fn loopback(app: &App, outgoing: Vec<WireMessage>) -> Result<Vec<WireMessage>, CliError> {
    let (bus_tx, mut bus_rx) = mpsc::channel::<WireMessage>(BUS_CAPACITY);
    let (reply_tx, mut reply_rx) = mpsc::channel::<WireMessage>(BUS_CAPACITY);

    // 受信側: 1 件ずつ dispatch して reply を返す
    let dispatcher = Arc::clone(app.dispatcher());
    let receiver = tokio::spawn(async move {
        while let Some(message) = bus_rx.recv().await {
            match dispatcher.dispatch(&message).await {
                Ok(Dispatched::Replied(reply)) => {
                    if reply_tx.send(reply).await.is_err() {
                        break;
                    }
                }
                Ok(Dispatched::Skipped) => info!("skipped a message that is not a task envelope"),
                Err(error) => warn!(%error, "dispatch failed"),
            }
        }
    });

    // 送信側: reply の読み出しと並行して送る（どちらの channel も有界）
    let sender = tokio::spawn(async move {
        for message in outgoing {
            bus_tx.send(message).await.map_err(|_| CliError::BusClosed)?;
        }
        Ok::<_, CliError>(())
    });

    // reply_tx は receiver の終了とともに drop されるので、ここで終わる
    let mut replies = Vec::new();
    while let Some(reply) = reply_rx.recv().await {
        replies.push(reply);
    }
    sender.await??;
    receiver.await?;
    Ok(replies)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_app() -> App {
        AppBuilder::default()
            .register::<Money, Receipt, _>(CHARGE_TASK, ChargeRunner)
            .unwrap()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn more_replies_than_the_bus_holds_are_all_delivered() {
        let app = demo_app();
        let count = BUS_CAPACITY * 3;
        let outgoing = (1..=count as u64)
            .map(|amount| {
                let money = Money {
                    amount,
                    currency: "JPY".to_string(),
                };
                app.codec()
                    .encode(&TaskEnvelope::<Money, Receipt>::request(CHARGE_TASK, money))
                    .unwrap()
            })
            .collect();

        let replies = loopback(&app, outgoing).await.unwrap();
        assert_eq!(replies.len(), count);
    }

    #[tokio::test]
    async fn foreign_messages_produce_no_reply() {
        let app = demo_app();
        let outgoing = vec![WireMessage::new(b"<ping/>".to_vec()).with_content_type("text/xml")];
        assert!(loopback(&app, outgoing).await.unwrap().is_empty());
    }
}
