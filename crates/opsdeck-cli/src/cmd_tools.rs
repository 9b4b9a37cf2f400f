use opsdeck_core::tools::{group_tools, takes_time_range};
use opsdeck_core::Backend;

use crate::Deck;

/// `opsdeck tools`
pub async fn execute(deck: &Deck, json: bool) -> anyhow::Result<()> {
    let tools = deck.backend.fetch_tools().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }
    if tools.is_empty() {
        println!("(no tools available)");
        return Ok(());
    }
    for (group, members) in group_tools(&tools) {
        println!("{}", group.label());
        for tool in members {
            let range = if takes_time_range(&tool.name) {
                "  [time range]"
            } else {
                ""
            };
            println!("  {:<24} {}{range}", tool.name, tool.hint());
        }
    }
    Ok(())
}
