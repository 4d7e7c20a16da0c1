//! Drivers
//!
//! A [`Driver`] is the single seam through which trees are parameterized. It
//! bundles three independent capabilities:
//!
//! - [`PathParser`] - path to depth and per-level segment names
//! - [`Realizer`] - threads a document through a processor list
//! - [`Modem`] - (de)serializes processor lists
//!
//! A tree holds one driver for its whole life and shares it with every
//! descendant.

pub mod modem;
pub mod path;
pub mod realizer;

pub use modem::{
    DummyModem, Encoding, GeneralModem, Modem, ModemError, ProcessorEnvelope, ProcessorRegistry,
};
pub use path::{DelimiterPathParser, PathParser};
pub use realizer::{RealizeError, Realizer, StdRealizer};

use crate::processors::{ProcessorRef, TileProcessor};
use std::fmt;
use std::sync::Arc;

/// Named bundle of path parser, realizer and modem
#[derive(Clone)]
pub struct Driver {
    name: String,
    parser: Arc<dyn PathParser>,
    realizer: Arc<dyn Realizer>,
    modem: Arc<dyn Modem>,
}

impl Driver {
    /// Start composing a custom driver
    ///
    /// Defaults to `/` paths, [`StdRealizer`] and [`DummyModem`].
    pub fn builder(name: impl Into<String>) -> DriverBuilder {
        DriverBuilder {
            name: name.into(),
            parser: Arc::new(DelimiterPathParser::slash()),
            realizer: Arc::new(StdRealizer),
            modem: Arc::new(DummyModem),
        }
    }

    /// JSON documents; processors travel as JSON envelopes
    pub fn json() -> Self {
        Self::builder("json")
            .modem(GeneralModem::json(Arc::new(ProcessorRegistry::standard())))
            .build()
    }

    /// YAML documents; processors travel as YAML envelopes
    pub fn yaml() -> Self {
        Self::builder("yaml")
            .modem(GeneralModem::yaml(Arc::new(ProcessorRegistry::standard())))
            .build()
    }

    /// Static tile content; the modem only knows tile processors
    pub fn tile() -> Self {
        let mut registry = ProcessorRegistry::new();
        registry.register::<TileProcessor>();
        Self::builder("tile")
            .modem(GeneralModem::json(Arc::new(registry)))
            .build()
    }

    /// Driver whose processors are never serialized
    pub fn dummy() -> Self {
        Self::builder("dummy").build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parser(&self) -> &dyn PathParser {
        self.parser.as_ref()
    }

    pub fn realizer(&self) -> &dyn Realizer {
        self.realizer.as_ref()
    }

    pub fn modem(&self) -> &dyn Modem {
        self.modem.as_ref()
    }

    pub fn level(&self, path: &str) -> usize {
        self.parser.level(path)
    }

    pub fn name_by_level<'p>(&self, path: &'p str, level: usize) -> &'p str {
        self.parser.name_by_level(path, level)
    }

    pub fn append_path(&self, parent: &str, name: &str) -> String {
        self.parser.append_path(parent, name)
    }

    pub fn realize(&self, baseline: &[u8], processors: &[ProcessorRef]) -> Result<Vec<u8>, RealizeError> {
        self.realizer.realize(baseline, processors)
    }

    pub fn marshal(&self, processors: &[ProcessorRef]) -> Result<Vec<u8>, ModemError> {
        self.modem.marshal(processors)
    }

    pub fn unmarshal(&self, data: &[u8]) -> Result<Vec<ProcessorRef>, ModemError> {
        self.modem.unmarshal(data)
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver").field("name", &self.name).finish()
    }
}

/// Builder for [`Driver`]
pub struct DriverBuilder {
    name: String,
    parser: Arc<dyn PathParser>,
    realizer: Arc<dyn Realizer>,
    modem: Arc<dyn Modem>,
}

impl DriverBuilder {
    pub fn parser(mut self, parser: impl PathParser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    pub fn realizer(mut self, realizer: impl Realizer + 'static) -> Self {
        self.realizer = Arc::new(realizer);
        self
    }

    pub fn modem(mut self, modem: impl Modem + 'static) -> Self {
        self.modem = Arc::new(modem);
        self
    }

    pub fn build(self) -> Driver {
        Driver {
            name: self.name,
            parser: self.parser,
            realizer: self.realizer,
            modem: self.modem,
        }
    }
}
