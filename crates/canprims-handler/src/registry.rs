use std::collections::HashMap;
use std::fmt;

use canprims_frame::CanFrame;
use tracing::trace;

/// Callback invoked for every received frame with its identifier byte.
pub type GlobalParser = Box<dyn Fn(u8, &CanFrame) + Send + Sync>;

/// Callback invoked only for frames carrying one identifier byte.
pub type FilterParser = Box<dyn Fn(&CanFrame) + Send + Sync>;

/// Maps identifier bytes to the callbacks that consume them.
///
/// Dispatch order is fixed: every global parser in registration order, then
/// every parser filtered on the frame's identifier in registration order.
/// Parsers are only ever added.
#[derive(Default)]
pub struct ParserRegistry {
    global: Vec<GlobalParser>,
    filtered: HashMap<u8, Vec<FilterParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parser that sees every frame.
    pub fn register_parser<F>(&mut self, parser: F)
    where
        F: Fn(u8, &CanFrame) + Send + Sync + 'static,
    {
        self.global.push(Box::new(parser));
    }

    /// Add a parser that sees only frames whose identifier byte is `id`.
    pub fn register_filter<F>(&mut self, id: u8, parser: F)
    where
        F: Fn(&CanFrame) + Send + Sync + 'static,
    {
        self.filtered.entry(id).or_default().push(Box::new(parser));
    }

    /// Builder form of [`ParserRegistry::register_parser`].
    pub fn with_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(u8, &CanFrame) + Send + Sync + 'static,
    {
        self.register_parser(parser);
        self
    }

    /// Builder form of [`ParserRegistry::register_filter`].
    pub fn with_filter<F>(mut self, id: u8, parser: F) -> Self
    where
        F: Fn(&CanFrame) + Send + Sync + 'static,
    {
        self.register_filter(id, parser);
        self
    }

    /// Run every matching parser for `frame`. Returns how many ran.
    pub fn dispatch(&self, frame: &CanFrame) -> usize {
        let id = frame.identifier();
        for parser in &self.global {
            parser(id, frame);
        }

        let filtered = self.filtered.get(&id).map_or(&[][..], Vec::as_slice);
        for parser in filtered {
            parser(frame);
        }

        let invoked = self.global.len() + filtered.len();
        trace!(id, invoked, "dispatched frame");
        invoked
    }

    /// Number of global parsers.
    pub fn global_count(&self) -> usize {
        self.global.len()
    }

    /// Number of parsers filtered on `id`.
    pub fn filter_count(&self, id: u8) -> usize {
        self.filtered.get(&id).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.filtered.is_empty()
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.filtered.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("ParserRegistry")
            .field("global", &self.global.len())
            .field("filtered_ids", &ids)
            .finish()
    }
}
