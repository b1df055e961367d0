#![allow(dead_code)]

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

pub struct Line {
    pub text: &'static str,
    pub size: i64,
    pub bold: bool,
}

pub fn heading(text: &'static str, size: i64) -> Line {
    Line { text, size, bold: true }
}

pub fn body(text: &'static str) -> Line {
    Line { text, size: 11, bold: false }
}

/// Three pages: a title, "1. Introduction" on page 1, "2. Methods" and "2.1 Setup" on page 2.
pub fn paper_pages() -> Vec<Vec<Line>> {
    vec![
        vec![
            heading("A Study of Small Things", 18),
            heading("1. Introduction", 14),
            body("Small things matter in many settings."),
            body("We look at them closely in this paper."),
        ],
        vec![
            heading("2. Methods", 14),
            body("We measured every small thing twice."),
            heading("2.1 Setup", 12),
            body("The setup used a ruler and a lamp."),
        ],
        vec![
            body("Results were consistent across runs."),
            body("Further work is left for later."),
        ],
    ]
}

fn build(pages: &[Vec<Line>]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = doc.add_object(dictionary! {
        "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica-Bold",
    });
    let resources = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => regular, "F2" => bold },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut ops = Vec::new();
        let mut y = 740i64;
        for line in lines {
            let font = if line.bold { "F2" } else { "F1" };
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new("Tf", vec![font.into(), line.size.into()]));
            ops.push(Operation::new("Td", vec![72.into(), y.into()]));
            ops.push(Operation::new("Tj", vec![Object::string_literal(line.text)]));
            ops.push(Operation::new("ET", vec![]));
            y -= line.size + 3;
        }
        let content = Content { operations: ops };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().expect("encode content")));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn write_pdf(path: &Path, pages: &[Vec<Line>]) {
    let mut doc = build(pages);
    doc.save(path).expect("save pdf");
}

/// A PDF whose trailer declares standard-handler encryption.
pub fn write_encrypted_pdf(path: &Path) {
    let mut doc = build(&paper_pages());
    let encrypt = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0x41u8; 32]),
        "U" => Object::string_literal(vec![0x42u8; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", encrypt);
    doc.save(path).expect("save pdf");
}

/// A single page with an empty content stream, as left by an image-only scan.
pub fn write_image_only_pdf(path: &Path) {
    let mut doc = build(&[vec![]]);
    doc.save(path).expect("save pdf");
}
