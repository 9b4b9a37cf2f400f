use std::path::Path;

use opsdeck_core::Backend;
use opsdeck_fragment::{Container, DocumentHost, Reanimator};
use opsdeck_history::{HistoryStore, Placeholder};

use crate::Deck;

/// `opsdeck export <index> --out FILE`: send a stored result to the
/// backend's export endpoint and save what comes back.
pub async fn execute(deck: &Deck, index: usize, out: &Path) -> anyhow::Result<()> {
    let mut store = HistoryStore::from_config(&deck.config);
    let view = store.refresh(deck.backend.as_ref()).await;
    if let Some(Placeholder::LoadError(message)) = view.placeholder {
        anyhow::bail!("could not load history: {message}");
    }
    let entry = store.select(index)?;

    // Scripts are only collected here; nothing is fetched.
    let host = DocumentHost::default();
    let mut container = Container::install(entry.fragment());
    let report = Reanimator::from_config(&deck.config)
        .reanimate(&mut container, &host)
        .await;
    tracing::debug!(scripts = report.total, "export document assembled");

    let bytes = deck
        .backend
        .export_document(&host.to_html(&entry.query, &container))
        .await?;
    std::fs::write(out, &bytes)
        .map_err(|e| anyhow::anyhow!("cannot write {}: {e}", out.display()))?;
    println!("Exported {} bytes to {}", bytes.len(), out.display());
    Ok(())
}
