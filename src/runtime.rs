//! Event loop tying the controller to the aggregator.
//!
//! The controller lives on this one task and is the only writer of surface
//! state. Fetches run as their own tasks and report back over a channel; the
//! loop interleaves those reports with UI commands.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::aggregate::{Aggregator, FetchPlan};
use crate::display::{ControlError, DisplayController, RenderSink, SurfaceId};
use crate::fetch::FeedClient;
use crate::source::SourceId;

/// A user gesture forwarded by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Toggle(SurfaceId),
    Refresh(SurfaceId),
    Select { surface: SurfaceId, source: SourceId },
}

impl Command {
    /// Parses `toggle <surface>`, `refresh <surface>` or
    /// `select <surface> <source>`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = match (words.next()?, words.next(), words.next()) {
            ("toggle", Some(surface), None) => Command::Toggle(surface.into()),
            ("refresh", Some(surface), None) => Command::Refresh(surface.into()),
            ("select", Some(surface), Some(source)) => Command::Select {
                surface: surface.into(),
                source: source.into(),
            },
            _ => return None,
        };
        words.next().is_none().then_some(command)
    }

    fn apply<S: RenderSink>(
        &self,
        controller: &mut DisplayController<S>,
    ) -> Result<Option<FetchPlan>, ControlError> {
        match self {
            Command::Toggle(surface) => controller.toggle(surface),
            Command::Refresh(surface) => controller.refresh(surface),
            Command::Select { surface, source } => controller.select_source(surface, source),
        }
    }
}

/// Runs until `commands` closes, then keeps applying results until no fetch
/// round is outstanding, and hands the controller back.
///
/// A fetch that never resolves keeps the drain phase waiting; callers that
/// need a deadline should wrap this future in one.
pub async fn run<C, S>(
    mut controller: DisplayController<S>,
    aggregator: Aggregator<C>,
    mut commands: mpsc::Receiver<Command>,
) -> DisplayController<S>
where
    C: FeedClient + 'static,
    S: RenderSink,
{
    let (tx, mut outcomes) = mpsc::unbounded_channel();

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                debug!(?command, "Command received");
                match command.apply(&mut controller) {
                    Ok(Some(plan)) => aggregator.dispatch(plan, &tx),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Command rejected"),
                }
            }
            Some(outcome) = outcomes.recv() => {
                controller.apply(outcome);
            }
        }
    }

    info!("Command channel closed, draining outstanding fetches");
    while !controller.is_idle() {
        match outcomes.recv().await {
            Some(outcome) => {
                controller.apply(outcome);
            }
            None => break,
        }
    }

    controller
}
