use std::path::Path;
use std::sync::Arc;

use opsdeck_client::HttpResourceLoader;
use opsdeck_core::tools::TIME_RANGE_CHOICES;
use opsdeck_fragment::{DocumentHost, ResourceLoader};
use opsdeck_history::{format_view, HistoryStore};
use opsdeck_render::{compose, ResultRenderer, ToolSelection};
use tokio::sync::Mutex;

use crate::surface::{write_document, TerminalSurface};
use crate::Deck;

/// `opsdeck ask <text> --tool <id>...`
pub async fn execute(
    deck: &Deck,
    text: &str,
    tools: &[String],
    hours: Option<u32>,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    check_hours(hours)?;
    let selection = ToolSelection::with(tools.iter().cloned());
    if hours.is_some() && !selection.time_range_visible() {
        eprintln!("note: none of the selected tools take a time range; --hours ignored");
    }
    let query = compose(text, &selection, hours)?;

    let loader: Arc<dyn ResourceLoader> = Arc::new(HttpResourceLoader::from_config(&deck.config));
    let host = Arc::new(DocumentHost::new(Some(loader)));
    let history = Arc::new(Mutex::new(HistoryStore::from_config(&deck.config)));
    let mut renderer = ResultRenderer::new(
        deck.backend.clone(),
        Arc::new(TerminalSurface::stdout()),
        host.clone(),
        history,
    )
    .configured(&deck.config);

    let rendered = renderer.submit(&query).await?;

    if let Some(path) = out {
        write_document(path, &host.to_html(text, &rendered.container))?;
    }
    if let Some(refresh) = rendered.history_refresh {
        match refresh.await {
            Ok(view) => print!("\nRecent queries:\n{}", format_view(&view)),
            Err(e) => tracing::debug!("history refresh did not finish: {e}"),
        }
    }
    Ok(())
}

fn check_hours(hours: Option<u32>) -> anyhow::Result<()> {
    match hours {
        Some(h) if !TIME_RANGE_CHOICES.contains(&h) => {
            let choices: Vec<String> = TIME_RANGE_CHOICES.iter().map(u32::to_string).collect();
            anyhow::bail!("unsupported time range {h}h (choose one of {})", choices.join(", "))
        }
        _ => Ok(()),
    }
}
