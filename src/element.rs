use crate::geometry::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrClass {
    Page,
    Line,
    Word,
}

/// Node of the page → line → word tree produced for one page.
///
/// Only words carry `text` and `confidence`; only the page carries `dpi` and
/// `page_number`.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrElement {
    pub ocr_class: OcrClass,
    pub bbox: BoundingBox,
    pub children: Vec<OcrElement>,
    pub text: Option<String>,
    pub confidence: Option<f32>,
    pub dpi: Option<f32>,
    pub page_number: Option<usize>,
}

impl OcrElement {
    fn new(ocr_class: OcrClass, bbox: BoundingBox) -> Self {
        Self {
            ocr_class,
            bbox,
            children: Vec::new(),
            text: None,
            confidence: None,
            dpi: None,
            page_number: None,
        }
    }

    pub fn page(bbox: BoundingBox, dpi: f32, page_number: usize) -> Self {
        Self {
            dpi: Some(dpi),
            page_number: Some(page_number),
            ..Self::new(OcrClass::Page, bbox)
        }
    }

    pub fn line(bbox: BoundingBox) -> Self {
        Self::new(OcrClass::Line, bbox)
    }

    pub fn word(bbox: BoundingBox, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: Some(text.into()),
            confidence: Some(confidence),
            ..Self::new(OcrClass::Word, bbox)
        }
    }

    /// All word nodes below this element, in reading order.
    pub fn words(&self) -> Box<dyn Iterator<Item = &OcrElement> + '_> {
        match self.ocr_class {
            OcrClass::Word => Box::new(std::iter::once(self)),
            _ => Box::new(self.children.iter().flat_map(|child| child.words())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_walks_the_tree() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let mut page = OcrElement::page(bbox, 300.0, 0);
        let mut first = OcrElement::line(bbox);
        first.children.push(OcrElement::word(bbox, "a", 0.5));
        first.children.push(OcrElement::word(bbox, "b", 0.5));
        let mut second = OcrElement::line(bbox);
        second.children.push(OcrElement::word(bbox, "c", 0.9));
        page.children.extend([first, second]);

        let texts = page
            .words()
            .filter_map(|word| word.text.as_deref())
            .collect::<Vec<_>>();
        assert_eq!(texts, ["a", "b", "c"]);
        assert_eq!(page.page_number, Some(0));
        assert!(page.text.is_none());
    }
}
