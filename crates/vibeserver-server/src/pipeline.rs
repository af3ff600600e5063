//! The per-request pipeline: inbound request in, outbound response out.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use tracing::{debug, error, info, trace};
use vibeserver_core::{
    CompletionPort, InboundRequest, OutboundResponse, OverrideSource, PromptConfig, build_prompt,
    collect_completion, parse_completion, serialize_request,
};

use crate::error::RequestError;
use crate::transport::{Liveness, PeerProbe};

/// Everything a request needs, shared by all connection tasks.
pub struct Gateway {
    completion: Arc<dyn CompletionPort>,
    prompt: PromptConfig,
    overrides: Arc<dyn OverrideSource>,
    strip_header_prefixes: Vec<String>,
    echo: bool,
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("completion", &self.completion)
            .field("prompt", &self.prompt)
            .field("strip_header_prefixes", &self.strip_header_prefixes)
            .field("echo", &self.echo)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn new(
        completion: Arc<dyn CompletionPort>,
        prompt: PromptConfig,
        overrides: Arc<dyn OverrideSource>,
    ) -> Self {
        Self {
            completion,
            prompt,
            overrides,
            strip_header_prefixes: Vec::new(),
            echo: false,
        }
    }

    /// Inbound headers starting with any of these prefixes never reach the
    /// model. Matching is case-insensitive.
    #[must_use]
    pub fn with_strip_header_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.strip_header_prefixes = prefixes;
        self
    }

    /// Stream completion text to stdout as it arrives.
    #[must_use]
    pub const fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Answer one request.
    ///
    /// Returns `None` when the client disconnected before the model was
    /// asked; nothing should be written in that case. Failures are turned
    /// into error responses here.
    pub async fn respond<P>(&self, request: InboundRequest, peer: &P) -> Option<OutboundResponse>
    where
        P: PeerProbe + Sync + ?Sized,
    {
        let method = request.method;
        let path = request.path.clone();

        match self.try_respond(request, peer).await {
            Ok(Some(response)) => {
                info!(%method, %path, status = response.status, "Request served");
                Some(response)
            }
            Ok(None) => {
                debug!(%method, %path, "Client disconnected before completion; abandoning");
                None
            }
            Err(e) => {
                error!(%method, %path, "Error processing request: {e}");
                Some(error_response(&e))
            }
        }
    }

    async fn try_respond<P>(
        &self,
        mut request: InboundRequest,
        peer: &P,
    ) -> Result<Option<OutboundResponse>, RequestError>
    where
        P: PeerProbe + Sync + ?Sized,
    {
        if request.is_favicon() {
            return Ok(Some(OutboundResponse::empty(404)));
        }

        request.headers.strip_prefixes(&self.strip_header_prefixes);

        if peer.liveness() == Liveness::Gone {
            return Ok(None);
        }

        let transcript = serialize_request(&request);
        let prompt = build_prompt(&transcript, &self.prompt, self.overrides.as_ref()).await;
        trace!("Prompt:\n{prompt}");

        let stream = self.completion.complete(&prompt).await?;
        let echo = self.echo;
        let completion = collect_completion(stream, |fragment| {
            if echo {
                let mut stdout = io::stdout().lock();
                let _ = stdout.write_all(fragment.as_bytes());
                let _ = stdout.flush();
            } else {
                trace!(fragment, "Completion fragment");
            }
        })
        .await?;
        if echo {
            println!();
        }

        Ok(Some(parse_completion(&completion)))
    }
}

/// Response sent when a request fails before or during completion.
pub fn error_response(error: &RequestError) -> OutboundResponse {
    let status = error.status();
    if status == 501 {
        return OutboundResponse::plain_text(status, error.to_string());
    }
    OutboundResponse::plain_text(status, format!("Error processing request: {error}"))
}
