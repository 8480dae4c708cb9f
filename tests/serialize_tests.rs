// tests/serialize_tests.rs

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;
use tiled_loader::{serialize_layer, serialize_map, serialize_tileset, Loader};

fn scratch_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("tiled_loader_{tag}_{nanos}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

const TMX: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" renderorder="right-down" width="2" height="2" tilewidth="16" tileheight="16" infinite="0" nextlayerid="4" nextobjectid="3">
 <properties>
  <property name="music" value="theme.ogg" type="file"/>
  <property name="gravity" type="float" value="9.8"/>
 </properties>
 <tileset firstgid="1" name="A" tilewidth="16" tileheight="16" tilecount="4" columns="2">
  <image source="a.png" width="32" height="32"/>
  <tile id="1" probability="0.5">
   <animation>
    <frame tileid="1" duration="100"/>
    <frame tileid="2" duration="100"/>
   </animation>
  </tile>
 </tileset>
 <layer id="1" name="ground" width="2" height="2">
  <data encoding="csv">1,2,
3,2147483649</data>
 </layer>
 <group id="2" name="decor" opacity="0.5">
  <objectgroup id="3" name="marks" color="#ff0000">
   <object id="1" x="1" y="2"><ellipse/></object>
   <object id="2"><polyline points="0,0 4,0 4,-3"/></object>
  </objectgroup>
 </group>
</map>
"##;

#[test]
fn map_serializes_to_key_value_records() {
    let dir = scratch_dir("serialize");
    let map = Loader::new().parse_map_str(TMX, Some(&dir)).unwrap();
    let v = serialize_map(&map).unwrap();

    assert_eq!(v["type"], json!("map"));
    assert_eq!(v["width"], json!(2));
    assert_eq!(v["renderorder"], json!("right-down"));
    assert_eq!(v["tilesets"][0]["firstgid"], json!(1));
    assert_eq!(v["tilesets"][0]["tiles"][0]["animation"][1]["tileid"], json!(2));
    assert_eq!(v["layers"][0]["type"], json!("tilelayer"));
    assert_eq!(v["layers"][0]["data"], json!([1, 2, 3, 2147483649u32]));
    assert_eq!(v["layers"][1]["type"], json!("group"));
    assert_eq!(v["layers"][1]["layers"][0]["objects"][0]["ellipse"], json!(true));
    assert_eq!(
        v["layers"][1]["layers"][0]["objects"][1]["polyline"][2],
        json!({"x": 4.0, "y": -3.0})
    );
    assert_eq!(v["properties"][1], json!({"name": "gravity", "type": "float", "value": 9.8}));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn serialized_map_parses_back_to_the_same_model() {
    let dir = scratch_dir("reparse");
    let loader = Loader::new();
    let map = loader.parse_map_str(TMX, Some(&dir)).unwrap();

    let text = serialize_map(&map).unwrap().to_string();
    let again = loader.parse_map_str(&text, Some(&dir)).unwrap();
    assert_eq!(again, map);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn base64_layers_keep_their_wire_format() {
    let json = r#"{
      "width": 2, "height": 1, "tilewidth": 8, "tileheight": 8,
      "layers": [{"type": "tilelayer", "name": "b", "width": 2, "height": 1,
                  "encoding": "base64", "compression": "gzip",
                  "data": "H4sIAAAAAAACA2NkYGBgAmIAfBeBAwgAAAA="}]
    }"#;
    let map = Loader::new().parse_map_str(json, None).unwrap();
    let layer = serialize_layer(&map.layers[0]).unwrap();
    assert_eq!(layer["encoding"], json!("base64"));
    assert_eq!(layer["compression"], json!("gzip"));
    assert!(layer["data"].is_string());

    let tileset = serialize_tileset(
        &Loader::new()
            .parse_tileset_str(
                r#"{"name":"t","tilewidth":8,"tileheight":8,"tilecount":2,"spacing":0}"#,
                None,
            )
            .unwrap(),
    )
    .unwrap();
    assert_eq!(tileset["type"], json!("tileset"));
    assert!(tileset.get("spacing").is_none());
    assert!(tileset.get("firstgid").is_none());
}
