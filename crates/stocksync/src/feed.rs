//! Supplier feed normalizer
//!
//! Reads the supplier's hierarchical XML (`product` → `mpn` + `stock/item`)
//! into the flat `key → SupplierStock` mapping. Malformed products are
//! skipped; malformed syntax aborts.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::model::{parse_quantity, SupplierStock, SupplierStockMap};

const PRODUCT: &[u8] = b"product";
const MPN: &[u8] = b"mpn";
const STOCK: &[u8] = b"stock";
const ITEM: &[u8] = b"item";
const ATTR_QUANTITY: &[u8] = b"quantity";
const ATTR_EAN: &[u8] = b"ean";

/// Normalized supplier feed plus parse statistics
#[derive(Debug, Default)]
pub struct SupplierFeed {
    pub stock: SupplierStockMap,
    /// Products that produced a parent entry
    pub products: usize,
    /// Products dropped for lack of an identifier
    pub skipped_products: usize,
    /// Line items whose quantity attribute was negative or unparsable
    pub coerced_quantities: usize,
}

impl SupplierFeed {
    pub fn len(&self) -> usize {
        self.stock.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }
}

#[derive(Debug)]
struct LineItem {
    quantity: i64,
    ean: Option<String>,
}

/// A `product` element still open in the document
#[derive(Debug)]
struct ProductDraft {
    depth: usize,
    mpn: Option<String>,
    /// Depth of the open `mpn` element while its text is being captured
    mpn_depth: Option<usize>,
    stock_seen: bool,
    stock_depth: Option<usize>,
    items: Vec<LineItem>,
}

impl ProductDraft {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            mpn: None,
            mpn_depth: None,
            stock_seen: false,
            stock_depth: None,
            items: Vec::new(),
        }
    }
}

struct FeedBuilder {
    feed: SupplierFeed,
    drafts: Vec<ProductDraft>,
}

impl FeedBuilder {
    fn open(&mut self, e: &BytesStart<'_>, depth: usize, empty: bool) -> Result<()> {
        let local = e.local_name();
        let name = local.as_ref();

        // The root itself is never a product
        if name == PRODUCT && depth > 1 {
            self.drafts.push(ProductDraft::new(depth));
            return Ok(());
        }

        let Some(draft) = self.drafts.last_mut() else {
            return Ok(());
        };

        if depth == draft.depth + 1 {
            if name == MPN && draft.mpn.is_none() {
                draft.mpn = Some(String::new());
                if !empty {
                    draft.mpn_depth = Some(depth);
                }
            } else if name == STOCK && !draft.stock_seen {
                draft.stock_seen = true;
                if !empty {
                    draft.stock_depth = Some(depth);
                }
            }
        } else if name == ITEM && draft.stock_depth == Some(depth - 1) {
            let item = read_item(e, &mut self.feed.coerced_quantities)?;
            draft.items.push(item);
        }
        Ok(())
    }

    fn text(&mut self, text: &str, depth: usize) {
        if let Some(draft) = self.drafts.last_mut() {
            if draft.mpn_depth == Some(depth) {
                if let Some(mpn) = draft.mpn.as_mut() {
                    mpn.push_str(text);
                }
            }
        }
    }

    fn close(&mut self, depth: usize) {
        let Some(draft) = self.drafts.last_mut() else {
            return;
        };
        if draft.mpn_depth == Some(depth) {
            draft.mpn_depth = None;
        }
        if draft.stock_depth == Some(depth) {
            draft.stock_depth = None;
        }
        if draft.depth == depth {
            if let Some(draft) = self.drafts.pop() {
                self.finish_product(draft);
            }
        }
    }

    fn finish_product(&mut self, draft: ProductDraft) {
        let sku = draft
            .mpn
            .map(|mpn| mpn.trim().to_string())
            .filter(|mpn| !mpn.is_empty());
        let Some(sku) = sku else {
            self.feed.skipped_products += 1;
            debug!(
                items = draft.items.len(),
                "Skipping feed product without identifier"
            );
            return;
        };

        let mut total: i64 = 0;
        for item in draft.items {
            total = total.saturating_add(item.quantity);
            if let Some(ean) = item.ean {
                let variant = SupplierStock::variant(&ean, item.quantity);
                self.feed.stock.insert(variant.key.clone(), variant);
            }
        }

        let parent = SupplierStock::parent(&sku, total);
        self.feed.stock.insert(parent.key.clone(), parent);
        self.feed.products += 1;
    }
}

fn read_item(e: &BytesStart<'_>, coerced: &mut usize) -> Result<LineItem> {
    let mut quantity_raw: Option<String> = None;
    let mut ean: Option<String> = None;

    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let value = attr.unescape_value()?;
        match attr.key.local_name().as_ref() {
            ATTR_QUANTITY => quantity_raw = Some(value.into_owned()),
            ATTR_EAN => {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    ean = Some(trimmed.to_string());
                }
            }
            _ => {}
        }
    }

    let quantity = match quantity_raw.as_deref() {
        None => 0,
        Some(raw) => match parse_quantity(raw) {
            Some(qty) if qty >= 0 => qty,
            _ => {
                *coerced += 1;
                debug!(raw, "Coercing feed quantity to 0");
                0
            }
        },
    };

    Ok(LineItem { quantity, ean })
}

/// Parse the raw feed document into supplier stock facts.
pub fn normalize_feed(xml: &[u8]) -> Result<SupplierFeed> {
    info!("Parsing supplier feed ({} bytes)...", xml.len());

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut builder = FeedBuilder {
        feed: SupplierFeed::default(),
        drafts: Vec::new(),
    };
    let mut open: usize = 0;
    let mut saw_root = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if open == 0 {
                    if saw_root {
                        return Err(SyncError::MalformedFeed(
                            "multiple root elements".to_string(),
                        ));
                    }
                    saw_root = true;
                }
                open += 1;
                builder.open(&e, open, false)?;
            }
            Event::Empty(e) => {
                if open == 0 {
                    if saw_root {
                        return Err(SyncError::MalformedFeed(
                            "multiple root elements".to_string(),
                        ));
                    }
                    saw_root = true;
                }
                builder.open(&e, open + 1, true)?;
                builder.close(open + 1);
            }
            Event::End(_) => {
                builder.close(open);
                open = open.saturating_sub(1);
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                builder.text(&text, open);
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c);
                builder.text(&text, open);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(SyncError::MalformedFeed(
            "document has no root element".to_string(),
        ));
    }
    if open > 0 {
        return Err(SyncError::MalformedFeed(format!(
            "unexpected end of document with {} unclosed element(s)",
            open
        )));
    }

    let feed = builder.feed;
    if feed.skipped_products > 0 {
        warn!(
            "Skipped {} feed product(s) without identifier",
            feed.skipped_products
        );
    }
    if feed.coerced_quantities > 0 {
        warn!(
            "Coerced {} malformed feed quantities to 0",
            feed.coerced_quantities
        );
    }
    info!(
        "Parsed {} products/variants from {} products",
        feed.len(),
        feed.products
    );
    Ok(feed)
}
