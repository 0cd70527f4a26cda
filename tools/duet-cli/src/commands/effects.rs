//! List the effect catalog.

use duet_effects::EffectCatalog;
use duet_media_model::effect::EffectCategory;

pub fn run() -> anyhow::Result<()> {
    let catalog = EffectCatalog::builtin();
    for (title, category) in [
        ("Filters", EffectCategory::Filter),
        ("Decorations (need a face anchor)", EffectCategory::Decoration),
    ] {
        println!("{title}:");
        for entry in catalog.entries().iter().filter(|e| e.category == category) {
            let gate = if entry.premium { " [premium]" } else { "" };
            println!("  {:<10} {}{gate}", entry.id, entry.name);
        }
        println!();
    }
    println!("Activate with: duet record --effect <id>[:intensity]");
    Ok(())
}
