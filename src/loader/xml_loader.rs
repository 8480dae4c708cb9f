// XML encoding: attributes and child elements mapped onto the raw records the
// JSON adapter deserializes directly.
use std::path::Path;
use std::str::FromStr;

use roxmltree::{Document, Node};
use serde_json::Value as JsonValue;

use crate::error::{required, MapError, Result};
use crate::raw::{
    RawChunk, RawFrame, RawGrid, RawLayer, RawMap, RawObject, RawPoint, RawProperty, RawTemplate,
    RawText, RawTile, RawTileData, RawTileOffset, RawTileset, RawTransformations, RawWangColor,
    RawWangSet, RawWangTile,
};

fn parse_document<'a>(text: &'a str, path: Option<&Path>) -> Result<Document<'a>> {
    Document::parse(text).map_err(|source| MapError::Xml {
        path: path.map(Path::to_path_buf),
        source,
    })
}

fn expect_root<'a, 'input>(doc: &'a Document<'input>, tag: &'static str) -> Result<Node<'a, 'input>> {
    let root = doc.root_element();
    if root.tag_name().name() != tag {
        return Err(MapError::invalid("root element", root.tag_name().name()));
    }
    Ok(root)
}

fn attribute<T: FromStr>(node: &Node, name: &'static str) -> Result<Option<T>> {
    node.attribute(name)
        .map(|v| v.trim().parse().map_err(|_| MapError::invalid(name, v)))
        .transpose()
}

fn required_attribute<T: FromStr>(
    node: &Node,
    context: &'static str,
    name: &'static str,
) -> Result<T> {
    required(attribute(node, name)?, context, name)
}

fn attribute_string(node: &Node, name: &str) -> Option<String> {
    node.attribute(name).map(str::to_owned)
}

/// Booleans are written as `1`/`0`; `true`/`false` is accepted too.
fn attribute_bool(node: &Node, name: &'static str) -> Result<Option<bool>> {
    node.attribute(name)
        .map(|v| match v.trim() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            other => Err(MapError::invalid(name, other)),
        })
        .transpose()
}

fn elements<'a, 'input: 'a>(
    node: &Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == tag)
}

fn child<'a, 'input: 'a>(node: &Node<'a, 'input>, tag: &'static str) -> Option<Node<'a, 'input>> {
    elements(node, tag).next()
}

fn properties(node: &Node) -> Option<Vec<RawProperty>> {
    let list = child(node, "properties")?;
    let props = elements(&list, "property")
        .map(|p| {
            let value = p
                .attribute("value")
                .or_else(|| p.text())
                .unwrap_or_default();
            RawProperty {
                name: p.attribute("name").unwrap_or_default().to_owned(),
                kind: Some(p.attribute("type").unwrap_or("string").to_owned()),
                value: JsonValue::String(value.to_owned()),
            }
        })
        .collect();
    Some(props)
}

fn points(node: &Node) -> Result<Option<Vec<RawPoint>>> {
    let Some(text) = node.attribute("points") else {
        return Ok(None);
    };
    text.split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| MapError::invalid("points", pair))?;
            let coord = |c: &str| c.parse::<f64>().map_err(|_| MapError::invalid("points", pair));
            Ok(RawPoint { x: coord(x)?, y: coord(y)? })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn text(node: &Node) -> Result<RawText> {
    Ok(RawText {
        text: node.text().unwrap_or_default().to_owned(),
        color: attribute_string(node, "color"),
        fontfamily: attribute_string(node, "fontfamily"),
        pixelsize: attribute(node, "pixelsize")?,
        bold: attribute_bool(node, "bold")?,
        italic: attribute_bool(node, "italic")?,
        kerning: attribute_bool(node, "kerning")?,
        strikeout: attribute_bool(node, "strikeout")?,
        underline: attribute_bool(node, "underline")?,
        halign: attribute_string(node, "halign"),
        valign: attribute_string(node, "valign"),
        wrap: attribute_bool(node, "wrap")?,
    })
}

fn object(node: &Node) -> Result<RawObject> {
    let marker = |tag| child(node, tag).map(|_| true);
    Ok(RawObject {
        id: attribute(node, "id")?,
        gid: attribute(node, "gid")?,
        template: attribute_string(node, "template"),
        name: attribute_string(node, "name"),
        kind: attribute_string(node, "type"),
        class: attribute_string(node, "class"),
        x: attribute(node, "x")?,
        y: attribute(node, "y")?,
        width: attribute(node, "width")?,
        height: attribute(node, "height")?,
        rotation: attribute(node, "rotation")?,
        opacity: attribute(node, "opacity")?,
        visible: attribute_bool(node, "visible")?,
        ellipse: marker("ellipse"),
        point: marker("point"),
        polygon: child(node, "polygon").map(|p| points(&p)).transpose()?.flatten(),
        polyline: child(node, "polyline").map(|p| points(&p)).transpose()?.flatten(),
        text: child(node, "text").map(|t| text(&t)).transpose()?,
        properties: properties(node),
    })
}

/// Tile data of a `<data>` or `<chunk>` element: encoded text, or one
/// `<tile gid=".."/>` child per cell in files without an encoding.
fn tile_data(node: &Node, encoded: bool) -> Result<RawTileData> {
    if encoded {
        return Ok(RawTileData::Encoded(node.text().unwrap_or_default().to_owned()));
    }
    elements(node, "tile")
        .map(|t| attribute(&t, "gid").map(Option::unwrap_or_default))
        .collect::<Result<Vec<u32>>>()
        .map(RawTileData::Gids)
}

fn chunk(node: &Node, encoded: bool) -> Result<RawChunk> {
    Ok(RawChunk {
        x: required_attribute(node, "chunk", "x")?,
        y: required_attribute(node, "chunk", "y")?,
        width: required_attribute(node, "chunk", "width")?,
        height: required_attribute(node, "chunk", "height")?,
        data: tile_data(node, encoded)?,
    })
}

fn layer_kind(tag: &str) -> Option<&'static str> {
    match tag {
        "layer" => Some("tilelayer"),
        "objectgroup" => Some("objectgroup"),
        "imagelayer" => Some("imagelayer"),
        "group" => Some("group"),
        _ => None,
    }
}

fn layer(node: &Node, kind: &'static str) -> Result<RawLayer> {
    let mut raw = RawLayer {
        kind: Some(kind.to_owned()),
        id: attribute(node, "id")?,
        name: node.attribute("name").unwrap_or_default().to_owned(),
        class: attribute_string(node, "class"),
        opacity: attribute(node, "opacity")?,
        visible: attribute_bool(node, "visible")?,
        offsetx: attribute(node, "offsetx")?,
        offsety: attribute(node, "offsety")?,
        parallaxx: attribute(node, "parallaxx")?,
        parallaxy: attribute(node, "parallaxy")?,
        tintcolor: attribute_string(node, "tintcolor"),
        repeatx: attribute_bool(node, "repeatx")?,
        repeaty: attribute_bool(node, "repeaty")?,
        startx: attribute(node, "startx")?,
        starty: attribute(node, "starty")?,
        width: attribute(node, "width")?,
        height: attribute(node, "height")?,
        properties: properties(node),
        draworder: attribute_string(node, "draworder"),
        color: attribute_string(node, "color"),
        ..Default::default()
    };

    match kind {
        "tilelayer" => {
            if let Some(data) = child(node, "data") {
                raw.encoding = attribute_string(&data, "encoding");
                raw.compression = attribute_string(&data, "compression");
                let encoded = raw.encoding.is_some();
                let chunks = elements(&data, "chunk")
                    .map(|c| chunk(&c, encoded))
                    .collect::<Result<Vec<_>>>()?;
                if chunks.is_empty() {
                    raw.data = Some(tile_data(&data, encoded)?);
                } else {
                    raw.chunks = Some(chunks);
                }
            }
        }
        "objectgroup" => {
            raw.objects = Some(elements(node, "object").map(|o| object(&o)).collect::<Result<_>>()?);
        }
        "imagelayer" => {
            if let Some(image) = child(node, "image") {
                raw.image = attribute_string(&image, "source");
                raw.transparentcolor = attribute_string(&image, "trans");
            }
        }
        _ => raw.layers = Some(layers(node)?),
    }
    Ok(raw)
}

/// Layer children of a map or group, in document order.
fn layers(node: &Node) -> Result<Vec<RawLayer>> {
    node.children()
        .filter(Node::is_element)
        .filter_map(|c| layer_kind(c.tag_name().name()).map(|kind| layer(&c, kind)))
        .collect()
}

fn terrain(text: &str) -> Result<Vec<i64>> {
    text.split(',')
        .map(|c| match c.trim() {
            "" => Ok(-1),
            v => v.parse().map_err(|_| MapError::invalid("terrain", text)),
        })
        .collect()
}

fn tile(node: &Node) -> Result<RawTile> {
    let image = child(node, "image");
    let animation = child(node, "animation")
        .map(|a| {
            elements(&a, "frame")
                .map(|f| {
                    Ok(RawFrame {
                        tileid: attribute(&f, "tileid")?.unwrap_or_default(),
                        duration: attribute(&f, "duration")?.unwrap_or_default(),
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?;

    Ok(RawTile {
        id: required_attribute(node, "tile", "id")?,
        kind: attribute_string(node, "type"),
        class: attribute_string(node, "class"),
        probability: attribute(node, "probability")?,
        image: image.and_then(|i| attribute_string(&i, "source")),
        imagewidth: image.map(|i| attribute(&i, "width")).transpose()?.flatten(),
        imageheight: image.map(|i| attribute(&i, "height")).transpose()?.flatten(),
        terrain: node.attribute("terrain").map(terrain).transpose()?,
        animation,
        objectgroup: child(node, "objectgroup")
            .map(|g| layer(&g, "objectgroup"))
            .transpose()?,
        properties: properties(node),
    })
}

fn wang_color(node: &Node) -> Result<RawWangColor> {
    Ok(RawWangColor {
        name: node.attribute("name").unwrap_or_default().to_owned(),
        color: node.attribute("color").unwrap_or_default().to_owned(),
        tile: attribute(node, "tile")?.unwrap_or(-1),
        probability: attribute(node, "probability")?.unwrap_or(1.0),
        class: attribute_string(node, "class"),
        properties: properties(node),
    })
}

fn wang_tile(node: &Node) -> Result<RawWangTile> {
    let wangid = node.attribute("wangid").unwrap_or_default();
    Ok(RawWangTile {
        tileid: attribute(node, "tileid")?.unwrap_or_default(),
        wangid: wangid
            .split(',')
            .map(|v| v.trim().parse().map_err(|_| MapError::invalid("wangid", wangid)))
            .collect::<Result<_>>()?,
    })
}

fn wang_set(node: &Node) -> Result<RawWangSet> {
    Ok(RawWangSet {
        name: node.attribute("name").unwrap_or_default().to_owned(),
        kind: attribute_string(node, "type"),
        tile: attribute(node, "tile")?.unwrap_or(-1),
        class: attribute_string(node, "class"),
        colors: elements(node, "wangcolor").map(|c| wang_color(&c)).collect::<Result<_>>()?,
        wangtiles: elements(node, "wangtile").map(|t| wang_tile(&t)).collect::<Result<_>>()?,
        properties: properties(node),
    })
}

fn tileset(node: &Node) -> Result<RawTileset> {
    let image = child(node, "image");
    let tiles = elements(node, "tile").map(|t| tile(&t)).collect::<Result<Vec<_>>>()?;
    let wangsets = child(node, "wangsets")
        .map(|w| elements(&w, "wangset").map(|s| wang_set(&s)).collect::<Result<Vec<_>>>())
        .transpose()?;

    let tileoffset = match child(node, "tileoffset") {
        Some(o) => Some(RawTileOffset {
            x: attribute(&o, "x")?.unwrap_or_default(),
            y: attribute(&o, "y")?.unwrap_or_default(),
        }),
        None => None,
    };
    let grid = match child(node, "grid") {
        Some(g) => Some(RawGrid {
            orientation: g.attribute("orientation").unwrap_or("orthogonal").to_owned(),
            width: attribute(&g, "width")?.unwrap_or_default(),
            height: attribute(&g, "height")?.unwrap_or_default(),
        }),
        None => None,
    };
    let transformations = match child(node, "transformations") {
        Some(t) => Some(RawTransformations {
            hflip: attribute_bool(&t, "hflip")?.unwrap_or_default(),
            vflip: attribute_bool(&t, "vflip")?.unwrap_or_default(),
            rotate: attribute_bool(&t, "rotate")?.unwrap_or_default(),
            preferuntransformed: attribute_bool(&t, "preferuntransformed")?.unwrap_or_default(),
        }),
        None => None,
    };

    Ok(RawTileset {
        firstgid: attribute(node, "firstgid")?,
        source: attribute_string(node, "source"),
        name: attribute_string(node, "name"),
        class: attribute_string(node, "class"),
        tilewidth: attribute(node, "tilewidth")?,
        tileheight: attribute(node, "tileheight")?,
        tilecount: attribute(node, "tilecount")?,
        columns: attribute(node, "columns")?,
        spacing: attribute(node, "spacing")?,
        margin: attribute(node, "margin")?,
        version: node.attribute("version").map(JsonValue::from),
        tiledversion: attribute_string(node, "tiledversion"),
        image: image.and_then(|i| attribute_string(&i, "source")),
        imagewidth: image.map(|i| attribute(&i, "width")).transpose()?.flatten(),
        imageheight: image.map(|i| attribute(&i, "height")).transpose()?.flatten(),
        transparentcolor: image.and_then(|i| attribute_string(&i, "trans")),
        backgroundcolor: attribute_string(node, "backgroundcolor"),
        objectalignment: attribute_string(node, "objectalignment"),
        tilerendersize: attribute_string(node, "tilerendersize"),
        fillmode: attribute_string(node, "fillmode"),
        tileoffset,
        grid,
        transformations,
        properties: properties(node),
        tiles: (!tiles.is_empty()).then_some(tiles),
        wangsets,
    })
}

pub(crate) fn map_from_str(text: &str, path: Option<&Path>) -> Result<RawMap> {
    let doc = parse_document(text, path)?;
    let root = expect_root(&doc, "map")?;

    Ok(RawMap {
        version: root.attribute("version").map(JsonValue::from),
        tiledversion: attribute_string(&root, "tiledversion"),
        class: attribute_string(&root, "class"),
        orientation: attribute_string(&root, "orientation"),
        renderorder: attribute_string(&root, "renderorder"),
        width: attribute(&root, "width")?,
        height: attribute(&root, "height")?,
        tilewidth: attribute(&root, "tilewidth")?,
        tileheight: attribute(&root, "tileheight")?,
        infinite: attribute_bool(&root, "infinite")?,
        nextlayerid: attribute(&root, "nextlayerid")?,
        nextobjectid: attribute(&root, "nextobjectid")?,
        backgroundcolor: attribute_string(&root, "backgroundcolor"),
        hexsidelength: attribute(&root, "hexsidelength")?,
        staggeraxis: attribute_string(&root, "staggeraxis"),
        staggerindex: attribute_string(&root, "staggerindex"),
        parallaxoriginx: attribute(&root, "parallaxoriginx")?,
        parallaxoriginy: attribute(&root, "parallaxoriginy")?,
        properties: properties(&root),
        tilesets: elements(&root, "tileset").map(|t| tileset(&t)).collect::<Result<_>>()?,
        layers: layers(&root)?,
    })
}

pub(crate) fn tileset_from_str(text: &str, path: Option<&Path>) -> Result<RawTileset> {
    let doc = parse_document(text, path)?;
    tileset(&expect_root(&doc, "tileset")?)
}

pub(crate) fn template_from_str(text: &str, path: Option<&Path>) -> Result<RawTemplate> {
    let doc = parse_document(text, path)?;
    let root = expect_root(&doc, "template")?;
    let object_node = child(&root, "object").ok_or(MapError::MissingField {
        context: "template",
        field: "object",
    })?;

    Ok(RawTemplate {
        object: object(&object_node)?,
        tileset: child(&root, "tileset").map(|t| tileset(&t)).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_xml_is_a_format_error() {
        let err = map_from_str("<map><layer></map>", None).unwrap_err();
        assert!(matches!(err, MapError::Xml { path: None, .. }));
        assert_eq!(err.kind(), crate::ErrorKind::Format);
    }

    #[test]
    fn wrong_root_element_is_rejected() {
        let err = map_from_str(r#"<tileset name="t"/>"#, None).unwrap_err();
        assert!(matches!(err, MapError::InvalidValue { field: "root element", .. }));
    }

    #[test]
    fn reads_layers_in_document_order() {
        let raw = map_from_str(
            r#"<map width="2" height="1" tilewidth="8" tileheight="8">
                 <layer id="1" name="ground" width="2" height="1">
                   <data encoding="csv">
1,2
</data>
                 </layer>
                 <objectgroup id="2" name="things"/>
                 <group id="3" name="g">
                   <imagelayer id="4" name="sky"><image source="sky.png" trans="ff00ff"/></imagelayer>
                 </group>
               </map>"#,
            None,
        )
        .unwrap();

        let kinds: Vec<_> = raw.layers.iter().map(|l| l.kind.as_deref().unwrap()).collect();
        assert_eq!(kinds, ["tilelayer", "objectgroup", "group"]);
        assert!(matches!(&raw.layers[0].data, Some(RawTileData::Encoded(t)) if t.contains("1,2")));
        let inner = &raw.layers[2].layers.as_ref().unwrap()[0];
        assert_eq!(inner.image.as_deref(), Some("sky.png"));
        assert_eq!(inner.transparentcolor.as_deref(), Some("ff00ff"));
    }

    #[test]
    fn legacy_tile_children_become_gids() {
        let raw = map_from_str(
            r#"<map width="2" height="1" tilewidth="8" tileheight="8">
                 <layer name="old" width="2" height="1">
                   <data><tile gid="3"/><tile/></data>
                 </layer>
               </map>"#,
            None,
        )
        .unwrap();
        assert!(matches!(&raw.layers[0].data, Some(RawTileData::Gids(g)) if g == &[3, 0]));
        assert!(raw.layers[0].encoding.is_none());
    }

    #[test]
    fn object_children_set_markers_and_points() {
        let raw = map_from_str(
            r#"<map><objectgroup name="o">
                 <object id="1" x="1" y="2"><ellipse/></object>
                 <object id="2"><point/></object>
                 <object id="3"><polygon points="0,0 4,0 4,-3"/></object>
                 <object id="4"><text wrap="1" halign="right">Hi there</text></object>
               </objectgroup></map>"#,
            None,
        )
        .unwrap();

        let objects = raw.layers[0].objects.as_ref().unwrap();
        assert_eq!(objects[0].ellipse, Some(true));
        assert_eq!(objects[0].x, Some(1.0));
        assert_eq!(objects[1].point, Some(true));
        let poly = objects[2].polygon.as_ref().unwrap();
        assert_eq!(poly.len(), 3);
        assert_eq!((poly[2].x, poly[2].y), (4.0, -3.0));
        let text = objects[3].text.as_ref().unwrap();
        assert_eq!(text.text, "Hi there");
        assert_eq!(text.wrap, Some(true));
        assert_eq!(text.halign.as_deref(), Some("right"));
    }

    #[test]
    fn untyped_properties_are_strings() {
        let raw = map_from_str(
            r#"<map><properties>
                 <property name="title" value="Cave"/>
                 <property name="notes">line one
line two</property>
                 <property name="hp" type="int" value="5"/>
               </properties></map>"#,
            None,
        )
        .unwrap();

        let props = raw.properties.unwrap();
        assert_eq!(props[0].kind.as_deref(), Some("string"));
        assert_eq!(props[1].value, JsonValue::from("line one\nline two"));
        assert_eq!(props[2].kind.as_deref(), Some("int"));
        assert_eq!(props[2].value, JsonValue::from("5"));
    }

    #[test]
    fn reads_tileset_details() {
        let raw = tileset_from_str(
            r##"<tileset version="1.10" name="terrain" tilewidth="16" tileheight="16" tilecount="4" columns="2">
                 <tileoffset x="2" y="-4"/>
                 <grid orientation="isometric" width="32" height="16"/>
                 <transformations hflip="1" vflip="0" rotate="1" preferuntransformed="0"/>
                 <image source="terrain.png" width="32" height="32"/>
                 <tile id="1" type="water" terrain="0,,1,">
                   <animation><frame tileid="1" duration="100"/><frame tileid="2" duration="200"/></animation>
                   <objectgroup draworder="index"><object id="1" width="4" height="4"/></objectgroup>
                 </tile>
                 <wangsets>
                   <wangset name="ground" type="corner" tile="-1">
                     <wangcolor name="grass" color="#00ff00" tile="0" probability="1"/>
                     <wangtile tileid="0" wangid="0,1,0,1,0,1,0,1"/>
                   </wangset>
                 </wangsets>
               </tileset>"##,
            None,
        )
        .unwrap();

        assert_eq!(raw.name.as_deref(), Some("terrain"));
        assert_eq!(raw.imagewidth, Some(32));
        assert_eq!(raw.tileoffset.map(|o| o.y), Some(-4.0));
        assert!(raw.transformations.unwrap().hflip);
        let tiles = raw.tiles.unwrap();
        assert_eq!(tiles[0].terrain, Some(vec![0, -1, 1, -1]));
        assert_eq!(tiles[0].animation.as_ref().map(Vec::len), Some(2));
        assert_eq!(tiles[0].objectgroup.as_ref().and_then(|g| g.kind.as_deref()), Some("objectgroup"));
        let sets = raw.wangsets.unwrap();
        assert_eq!(sets[0].wangtiles[0].wangid, vec![0, 1, 0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn template_reads_object_and_tileset() {
        let raw = template_from_str(
            r#"<template>
                 <tileset firstgid="1" source="chests.tsx"/>
                 <object name="chest" gid="2" width="16" height="16"/>
               </template>"#,
            None,
        )
        .unwrap();
        assert_eq!(raw.object.gid, Some(2));
        assert_eq!(raw.tileset.and_then(|t| t.source), Some("chests.tsx".into()));
    }
}
