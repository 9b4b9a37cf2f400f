use std::path::Path;
use std::sync::Arc;

use opsdeck_client::HttpResourceLoader;
use opsdeck_fragment::{DocumentHost, ResourceLoader};
use opsdeck_history::{HistoryStore, Placeholder};
use opsdeck_render::ResultRenderer;
use tokio::sync::Mutex;

use crate::surface::{write_document, TerminalSurface};
use crate::Deck;

/// `opsdeck show <index>`: replay a stored result. Indexes refer to the
/// snapshot fetched here, which is the same order `opsdeck history` prints.
pub async fn execute(deck: &Deck, index: usize, out: Option<&Path>) -> anyhow::Result<()> {
    let history = Arc::new(Mutex::new(HistoryStore::from_config(&deck.config)));
    let query = {
        let mut store = history.lock().await;
        let view = store.refresh(deck.backend.as_ref()).await;
        if let Some(Placeholder::LoadError(message)) = view.placeholder {
            anyhow::bail!("could not load history: {message}");
        }
        store.select(index)?.query.clone()
    };

    let loader: Arc<dyn ResourceLoader> = Arc::new(HttpResourceLoader::from_config(&deck.config));
    let host = Arc::new(DocumentHost::new(Some(loader)));
    let mut renderer = ResultRenderer::new(
        deck.backend.clone(),
        Arc::new(TerminalSurface::stdout()),
        host.clone(),
        history,
    )
    .configured(&deck.config);

    println!("> {query}\n");
    let rendered = renderer.show_history_result(index).await?;

    if let Some(path) = out {
        write_document(path, &host.to_html(&query, &rendered.container))?;
    }
    Ok(())
}
