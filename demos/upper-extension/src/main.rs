//! Upper Extension
//!
//! A reference implementation of a Glyph extension. It demonstrates the
//! request/response contract: read one JSON request from stdin, print one
//! JSON response on stdout, exit 0.
//!
//! # Behaviour
//!
//! `|upper, some **text**|` uppercases its first argument and hands the result
//! back wrapped in an `id` call, so the host still applies markup to it.
//!
//! # Usage
//!
//! ```bash
//! glyph resolve --input doc.gl --define upper=glyph-upper
//! ```

use glyph_protocol::{
    decode_request, ActionRequest, ActionResponse, ContentNode, ExtensionCall,
    ExtensionDescriptor, InfoResponse, InvocationRequest,
};
use std::io::{Read, Write};
use std::process::ExitCode;

// ============================================================================
// Descriptor
// ============================================================================

fn descriptor() -> ExtensionDescriptor {
    ExtensionDescriptor::new("upper", env!("CARGO_PKG_VERSION"))
        .with_description("Uppercases its argument")
        .with_format("html")
        .with_format("latex")
        .with_format("text")
}

// ============================================================================
// Action
// ============================================================================

fn act(request: &ActionRequest) -> ActionResponse {
    let Some(text) = request.arguments.first().and_then(ContentNode::as_text) else {
        return ActionResponse {
            errors: vec!["upper expects a text argument".to_string()],
            ..ActionResponse::default()
        };
    };

    let mut response = ActionResponse::with_content(vec![ExtensionCall::inline("id")
        .with_argument(text.to_uppercase())
        .into()]);
    if request.arguments.len() > 1 {
        response
            .warnings
            .push("upper ignores every argument after the first".to_string());
    }
    response
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let mut input = Vec::new();
    if let Err(e) = std::io::stdin().read_to_end(&mut input) {
        eprintln!("failed to read request: {}", e);
        return ExitCode::from(1);
    }

    let request = match decode_request(&input) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("invalid request: {}", e);
            return ExitCode::from(1);
        }
    };

    let response = match request {
        InvocationRequest::Info(_) => serde_json::to_string(&InfoResponse::new(descriptor())),
        InvocationRequest::Action(action) => serde_json::to_string(&act(&action)),
    };

    match response {
        Ok(json) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(json.as_bytes()) {
                eprintln!("failed to write response: {}", e);
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to encode response: {}", e);
            ExitCode::from(1)
        }
    }
}
