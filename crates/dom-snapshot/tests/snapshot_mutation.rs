use dom_snapshot::{escape_attr_value, escape_ident, text_digest, Document};
use serde_json::json;

fn page() -> Document {
    Document::from_json_value(json!({
        "viewport": { "width": 1024, "height": 768 },
        "root": {
            "tag": "html",
            "children": [{
                "tag": "body",
                "children": [
                    { "tag": "ul", "attrs": { "id": "todo" }, "children": [
                        { "tag": "li", "attrs": { "class": "item" }, "children": [{ "text": "Buy  milk" }] },
                        { "tag": "li", "attrs": { "class": "item done" }, "children": [{ "text": "Call Sam" }] }
                    ]},
                    { "tag": "ul", "attrs": { "id": "3col" } }
                ]
            }]
        }
    }))
    .unwrap()
}

#[test]
fn mutations_survive_a_snapshot_round_trip() {
    let mut doc = page();
    let milk = doc.query_selector("li.item").unwrap().unwrap();
    let target_list = doc.elements_by_tag("ul")[1];

    doc.set_attr(milk, "data-pointa-id", "pointa-abc\"1").unwrap();
    doc.append_child(target_list, milk).unwrap();

    let reloaded = Document::from_snapshot(&doc.to_snapshot().unwrap()).unwrap();
    assert_eq!(reloaded.viewport().width, 1024.0);

    let by_marker = format!(
        "li[data-pointa-id=\"{}\"]",
        escape_attr_value("pointa-abc\"1")
    );
    let moved = reloaded.query_selector_all(&by_marker).unwrap();
    assert_eq!(moved.len(), 1);

    let list = format!("#{} > li", escape_ident("3col"));
    assert_eq!(reloaded.query_selector_all(&list).unwrap(), moved);
    assert_eq!(reloaded.query_selector_all("#todo > li").unwrap().len(), 1);
}

#[test]
fn text_digest_selects_by_normalized_text() {
    let doc = page();
    let selector = format!("li:text-digest({})", text_digest("Buy milk"));
    let matches = doc.query_selector_all(&selector).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(doc.normalized_text(matches[0]), "Buy milk");
    assert!(doc
        .query_selector_all("li:text-digest(000000000000)")
        .unwrap()
        .is_empty());
}

#[test]
fn inline_element_text_keeps_the_element() {
    let doc = Document::from_json_value(json!({
        "root": {
            "tag": "html",
            "children": [{
                "tag": "body",
                "children": [
                    { "tag": "button", "text": "Save", "attrs": { "id": "save" } },
                    { "text": " or " },
                    { "tag": "a", "text": "Cancel", "children": [{ "text": " edits" }] }
                ]
            }]
        }
    }))
    .unwrap();

    let save = doc.query_selector("#save").unwrap().unwrap();
    assert_eq!(doc.tag_name(save), Some("button"));
    assert_eq!(doc.normalized_text(save), "Save");
    let cancel = doc.elements_by_tag("a")[0];
    assert_eq!(doc.normalized_text(cancel), "Cancel edits");

    let reloaded = Document::from_snapshot(&doc.to_snapshot().unwrap()).unwrap();
    let save = reloaded.query_selector("button#save").unwrap().unwrap();
    assert_eq!(reloaded.normalized_text(save), "Save");
    assert_eq!(
        reloaded.normalized_text(reloaded.elements_by_tag("body")[0]),
        "Save or Cancel edits"
    );
}
