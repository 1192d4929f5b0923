//! End-to-end sentence extraction scenarios

use corpus_xml::{
    Annotations, BlockParser, Dialect, Document, SentenceConfig, SentenceParser,
};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

/// Reader adapter that delivers at most `chunk` bytes per read call,
/// to exercise arbitrary input chunking.
struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl ChunkedReader {
    fn new(data: &[u8], chunk: usize) -> Self {
        ChunkedReader {
            data: data.to_vec(),
            pos: 0,
            chunk: chunk.max(1),
        }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self
            .chunk
            .min(buf.len())
            .min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

fn doc(xml: &str) -> Document<Cursor<Vec<u8>>> {
    Document::new("corpus.xml", Cursor::new(xml.as_bytes().to_vec()))
}

const BOOKS_XML: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
    <text><body>\n\
    <s id=\"s1\">\n\
    <chunk type=\"NP\" id=\"c1-1\">\n\
    <w hun=\"NN\" tree=\"NN\" lem=\"source\" pos=\"NN\" id=\"w1.1\">Source</w>\n\
    </chunk>\n\
    <w hun=\":\" tree=\":\" lem=\":\" pos=\":\" id=\"w1.2\">:</w>\n\
    <w hun=\"NNP\" tree=\"NP\" lem=\"Project\" pos=\"NNP\" id=\"w1.3\">Project</w>\n\
    <w hun=\"NNP\" tree=\"NP\" pos=\"NNP\" id=\"w1.4\">GutenbergTranslation</w>\n\
    </s>\n\
    </body></text>\n";

#[test]
fn xml_dialect_end_to_end() {
    let records: Vec<_> = SentenceParser::new(doc(BOOKS_XML), SentenceConfig::new(Dialect::Xml))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records.len(), 1);
    let (id, sentence) = &records[0];
    assert_eq!(id, "s1");
    assert_eq!(sentence.text, "Source : Project GutenbergTranslation");
    assert_eq!(
        sentence.attributes,
        BTreeMap::from([("id".to_string(), "s1".to_string())])
    );
}

#[test]
fn raw_dialect_end_to_end() {
    let xml = "<text><body>\n\
        <s id=\"s2\">  Hunchback of Notre-Dame\n</s>\n\
        </body></text>\n";
    let records: Vec<_> = SentenceParser::new(doc(xml), SentenceConfig::new(Dialect::Raw))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, "s2");
    assert_eq!(records[0].1.text, "Hunchback of Notre-Dame");
    assert_eq!(
        records[0].1.attributes,
        BTreeMap::from([("id".to_string(), "s2".to_string())])
    );
}

#[test]
fn preserve_mode_leading_marker() {
    let xml = "<document>\n\
        <s id=\"1\">\n\
        <time id=\"T1S\" value=\"00:00:05,897\" />\n\
        <w id=\"1.1\">-</w>\n\
        <w id=\"1.2\">How</w>\n\
        </s>\n\
        </document>\n";
    let config = SentenceConfig::new(Dialect::Xml).preserve(true);
    let records: Vec<_> = SentenceParser::new(doc(xml), config)
        .collect::<Result<_, _>>()
        .unwrap();
    let text = &records[0].1.text;
    assert!(
        text.starts_with("<time id=\"T1S\" value=\"00:00:05,897\" /> "),
        "marker not leading: {text}"
    );
    assert_eq!(text, "<time id=\"T1S\" value=\"00:00:05,897\" /> - How");
}

#[test]
fn comment_containing_gt_is_accepted() {
    let xml = "<body><!-- a > b -->\n<s id=\"s1\"><w>ok</w></s></body>\n";
    let records: Vec<_> = SentenceParser::new(doc(xml), SentenceConfig::new(Dialect::Xml))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].1.text, "ok");
}

#[test]
fn cdata_containing_gt_is_accepted() {
    let xml = "<body><s id=\"s1\"><![CDATA[a > b]]>\n</s></body>\n";
    let records: Vec<_> = SentenceParser::new(doc(xml), SentenceConfig::new(Dialect::Raw))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records[0].1.text, "a > b");
}

#[test]
fn truncated_document_keeps_earlier_records() {
    let xml = "<document>\n\
        <s id=\"1\"><w>first</w></s>\n\
        <s id=\"2\"><w>second</w></s>\n\
        <s id=\"3\"><w>third";
    let mut parser = SentenceParser::new(doc(xml), SentenceConfig::new(Dialect::Xml));

    assert_eq!(parser.next().unwrap().unwrap().0, "1");
    assert_eq!(parser.next().unwrap().unwrap().0, "2");
    let err = parser.next().unwrap().unwrap_err();
    assert!(err.to_string().contains("corpus.xml"), "no identity: {err}");
    assert!(parser.next().is_none());
}

#[test]
fn metadata_outside_boundary_is_never_yielded() {
    let xml = "<text><head><meta id=\"m\"><w>header</w></meta></head>\n\
        <body><s id=\"s1\"><w>real</w></s></body></text>\n";
    let ids: Vec<String> = SentenceParser::new(doc(xml), SentenceConfig::new(Dialect::Xml))
        .map(|r| r.unwrap().0)
        .collect();
    assert_eq!(ids, ["s1"]);
}

#[test]
fn repeated_ids_yield_two_records() {
    let xml = "<body><s id=\"dup\"><w>a</w></s><s id=\"dup\"><w>b</w></s></body>";
    let texts: Vec<String> = SentenceParser::new(doc(xml), SentenceConfig::new(Dialect::Xml))
        .map(|r| r.unwrap().1.text)
        .collect();
    assert_eq!(texts, ["a", "b"]);
}

fn boundary_ids(xml: &str, chunk: usize) -> Vec<String> {
    let document = Document::new("corpus.xml", ChunkedReader::new(xml.as_bytes(), chunk));
    BlockParser::new(document, "s")
        .map(|r| r.unwrap().attribute("id").unwrap_or_default().to_string())
        .collect()
}

proptest! {
    /// The number and order of boundary subtrees is invariant under input
    /// chunk size.
    #[test]
    fn chunk_size_invariance(chunk in 1usize..64) {
        let baseline = boundary_ids(BOOKS_XML, BOOKS_XML.len());
        let chunked = boundary_ids(BOOKS_XML, chunk);
        prop_assert_eq!(baseline, chunked);
    }

    /// "All" annotation rendering does not depend on attribute order in the
    /// source markup.
    #[test]
    fn annotation_rendering_order_independent(
        perm in proptest::sample::subsequence(
            vec![("hun", "NN"), ("lem", "source"), ("pos", "NN"), ("tree", "NN")], 4)
            .prop_shuffle()
    ) {
        let attrs: String = perm
            .iter()
            .map(|(k, v)| format!(" {k}=\"{v}\""))
            .collect();
        let xml = format!("<body><s id=\"s1\"><w{attrs} id=\"w1\">Source</w></s></body>");
        let records: Vec<_> =
            SentenceParser::new(doc(&xml), SentenceConfig::new(Dialect::Parsed))
                .collect::<Result<_, _>>()
                .unwrap();
        prop_assert_eq!(
            records[0].1.text.as_str(),
            "Source|NN|w1|source|NN|NN"
        );
    }
}

#[test]
fn named_annotations_follow_caller_order() {
    let config = SentenceConfig::new(Dialect::Parsed).annotations(Annotations::Named(vec![
        "pos".to_string(),
        "hun".to_string(),
    ]));
    let records: Vec<_> = SentenceParser::new(doc(BOOKS_XML), config)
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(records[0].1.text.starts_with("Source|NN|NN "));
}
