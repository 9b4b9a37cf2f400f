use std::sync::Arc;

use opsdeck_core::SystemClock;
use opsdeck_status::StatusAggregator;
use tokio_util::sync::CancellationToken;

use crate::Deck;

/// Launch the live dashboard.
///
/// With the `tui` feature (default): opens the interactive ratatui dashboard.
/// Without: prints each source as it publishes.
pub async fn execute(deck: &Deck) -> anyhow::Result<()> {
    let aggregator =
        StatusAggregator::new(deck.backend.clone(), Arc::new(SystemClock), &deck.config)?;
    let board = aggregator.spawn(CancellationToken::new());

    #[cfg(feature = "tui")]
    {
        crate::tui::run(board, deck).await
    }

    #[cfg(not(feature = "tui"))]
    {
        plain(board).await
    }
}

#[cfg(not(feature = "tui"))]
async fn plain(mut board: opsdeck_status::StatusBoard) -> anyhow::Result<()> {
    use time::macros::format_description;

    eprintln!("opsdeck watch (plain mode; rebuild with the `tui` feature for the dashboard)");
    eprintln!("Press Ctrl-C to stop.\n");

    while let Some(kind) = board.changed().await {
        let now = board.now();
        let stamp = now
            .to_offset(board.reference())
            .format(format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_default();
        println!("[{stamp}] {} updated", kind.label());
        println!("{}\n", board.overlay().render_text());
        print!(
            "{}",
            crate::cmd_status::format_report(&board.report(), now, board.window(), board.reference())
        );
    }
    board.shutdown().await;
    Ok(())
}
