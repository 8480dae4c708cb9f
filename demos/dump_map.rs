use anyhow::Context;
use tiled_loader::{parse_map, serialize_map, LayerKind};

// Usage: cargo run --example dump_map -- path/to/map.tmx [--summary]
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = args.next().context("usage: dump_map <map file> [--summary]")?;
    let summary = args.any(|a| a == "--summary");

    let map = parse_map(&path).with_context(|| format!("loading {path}"))?;

    if summary {
        println!(
            "{} map, {}x{} tiles of {}x{} px",
            map.orientation,
            map.map_size.width,
            map.map_size.height,
            map.tile_size.width,
            map.tile_size.height
        );
        for (first, ts) in map.tilesets.iter() {
            println!("  tileset '{}' firstgid={} tiles={}", ts.name, first, ts.tile_count);
        }
        for layer in map.walk_layers() {
            let kind = match &layer.kind {
                LayerKind::Tile(_) => "tiles",
                LayerKind::Object(group) => {
                    println!("  layer '{}' objects={}", layer.name, group.objects.len());
                    continue;
                }
                LayerKind::Image(_) => "image",
                LayerKind::Group(_) => "group",
            };
            println!("  layer '{}' ({kind})", layer.name);
        }
        return Ok(());
    }

    let json = serialize_map(&map)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
