use std::fmt::Display;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::events::ViewerCommand;

/// 12-hour `h:mm`, no leading zero on the hour.
pub fn clock_label<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    now.format("%-I:%M").to_string()
}

/// Keeps the viewer's clock label current, sending only when the text changes.
pub async fn run(
    to_viewer: Sender<ViewerCommand>,
    period: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut shown: Option<String> = None;

    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting clock task");
                break;
            }
            _ = ticks.tick() => {
                let label = clock_label(&Local::now());
                if shown.as_deref() == Some(label.as_str()) {
                    continue;
                }
                shown = Some(label.clone());
                if to_viewer.send(ViewerCommand::Clock(label)).await.is_err() {
                    warn!("viewer channel closed");
                    break;
                }
            }
        }
    }
    Ok(())
}
