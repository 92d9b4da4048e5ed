//! Collaborators shared by every responder on a connection.

use std::sync::Arc;

use crate::{
    config::ResponderConfig,
    fragment::{DefaultPayloadDecoder, PayloadDecoder, PayloadSender},
    outbound::OutboundSender,
    registry::StreamRegistry,
};

/// Configuration, outbound channel, registry and decoder injected into each
/// [`RequestStreamResponder`](super::RequestStreamResponder).
#[derive(Clone)]
pub struct ResponderSupport {
    config: ResponderConfig,
    sender: PayloadSender,
    registry: Arc<dyn StreamRegistry>,
    decoder: Arc<dyn PayloadDecoder>,
}

impl ResponderSupport {
    /// Bundle the collaborators using the [`DefaultPayloadDecoder`].
    #[must_use]
    pub fn new(
        config: ResponderConfig,
        outbound: OutboundSender,
        registry: Arc<dyn StreamRegistry>,
    ) -> Self {
        Self {
            sender: PayloadSender::new(outbound, config.max_frame_length),
            config,
            registry,
            decoder: Arc::new(DefaultPayloadDecoder),
        }
    }

    /// Replace the payload decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn PayloadDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ResponderConfig { &self.config }

    #[must_use]
    pub fn sender(&self) -> &PayloadSender { &self.sender }

    #[must_use]
    pub fn outbound(&self) -> &OutboundSender { self.sender.outbound() }

    #[must_use]
    pub fn registry(&self) -> &dyn StreamRegistry { self.registry.as_ref() }

    #[must_use]
    pub fn decoder(&self) -> &dyn PayloadDecoder { self.decoder.as_ref() }
}
