use tracing::{debug, info, warn};

use crate::adapter::parse_extraction;
use crate::api_types::{ApiExtractionRequest, ExtractionSchema};
use crate::error::TurnError;
use crate::image::EncodedImage;
use crate::models::{ImageRef, ReportState};
use crate::photo::PhotoBinding;
use crate::report::{apply_turn, TurnInput};

/// Handle for one outstanding turn. Only the most recently issued ticket can
/// commit a response.
#[derive(Debug)]
pub struct TurnTicket {
    seq: u64,
    transcript: String,
    image: Option<EncodedImage>,
}

impl TurnTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn request(&self) -> ApiExtractionRequest {
        ApiExtractionRequest {
            transcript: self.transcript.clone(),
            image: self.image.as_ref().map(EncodedImage::to_payload),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSummary {
    pub seq: u64,
    pub binding: PhotoBinding,
    pub reply: Option<String>,
}

/// One inspection: the report plus the turn sequencing around it.
#[derive(Debug)]
pub struct Session {
    schema: ExtractionSchema,
    state: ReportState,
    next_seq: u64,
    pending: Option<u64>,
}

impl Session {
    pub fn new(schema: ExtractionSchema) -> Self {
        Self {
            schema,
            state: ReportState::default(),
            next_seq: 1,
            pending: None,
        }
    }

    pub fn schema(&self) -> ExtractionSchema {
        self.schema
    }

    pub fn state(&self) -> &ReportState {
        &self.state
    }

    pub fn pending(&self) -> Option<u64> {
        self.pending
    }

    /// Starts a new inspection. Sequence numbers keep counting so responses
    /// requested before the reset can never commit.
    pub fn reset(&mut self) {
        if let Some(seq) = self.pending.take() {
            warn!("Reset while turn {} was pending; its response will be discarded", seq);
        }
        self.state = ReportState::default();
        info!("Session reset - next_turn={}", self.next_seq);
    }

    pub fn begin_turn(
        &mut self,
        transcript: impl Into<String>,
        image: Option<EncodedImage>,
    ) -> Result<TurnTicket, TurnError> {
        if let Some(pending) = self.pending {
            return Err(TurnError::TurnInFlight { pending });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending = Some(seq);
        debug!("Turn started - turn={}, has_image={}", seq, image.is_some());
        Ok(TurnTicket {
            seq,
            transcript: transcript.into(),
            image,
        })
    }

    /// Abandons the pending turn; a response arriving for it later is stale.
    pub fn cancel_turn(&mut self) -> Option<u64> {
        let cancelled = self.pending.take();
        if let Some(seq) = cancelled {
            info!("Turn cancelled - turn={}", seq);
        }
        cancelled
    }

    /// The extraction call for `ticket` failed; the state is unchanged and the
    /// transcript may be resubmitted as a new turn.
    pub fn fail_turn(&mut self, ticket: &TurnTicket) {
        if self.pending == Some(ticket.seq) {
            self.pending = None;
        }
    }

    /// Commits the extraction response for `ticket`, all or nothing.
    pub fn complete_turn(&mut self, ticket: &TurnTicket, body: &str) -> Result<TurnSummary, TurnError> {
        if self.pending != Some(ticket.seq) {
            warn!(
                "Stale extraction response discarded - turn={}, pending={:?}",
                ticket.seq, self.pending
            );
            return Err(TurnError::StaleResponse { turn: ticket.seq });
        }
        // whatever happens next, this turn is over
        self.pending = None;

        let batch = parse_extraction(self.schema, body)?;
        let input = TurnInput {
            seq: ticket.seq,
            transcript: ticket.transcript.clone(),
            image: ticket.image.as_ref().map(EncodedImage::to_data_url),
        };
        let applied = apply_turn(&self.state, &batch, &input)?;
        self.state = applied.state;

        Ok(TurnSummary {
            seq: ticket.seq,
            binding: applied.binding,
            reply: applied.reply,
        })
    }

    pub fn add_workplace_photo(&mut self, location_name: &str, image: ImageRef) -> Result<usize, TurnError> {
        self.state.add_workplace_photo(location_name, image)
    }
}
