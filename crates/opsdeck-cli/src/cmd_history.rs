use opsdeck_history::{format_view, HistoryStore};

use crate::Deck;

/// `opsdeck history [--all] [--search TERM]`
pub async fn execute(deck: &Deck, all: bool, search: Option<&str>, json: bool) -> anyhow::Result<()> {
    let mut store = HistoryStore::from_config(&deck.config);
    let mut view = store.refresh(deck.backend.as_ref()).await;
    if all {
        view = store.set_expanded(true);
    }
    if let Some(term) = search {
        view = store.search(term);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", format_view(&view));
    }
    Ok(())
}
