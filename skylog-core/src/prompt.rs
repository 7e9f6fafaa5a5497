//! Turning form fields, log text and an optional screenshot into a model request

use crate::attachment::ImageAttachment;
use crate::error::AnalysisError;
use crate::hardware::HardwareContext;
use llm::{ChatMessage, ChatPayload, ContentBlock};

pub const SYSTEM_INSTRUCTION: &str = "\
You are an expert flight controller analyst specialising in multirotor and fixed-wing drones \
running ArduPilot, PX4, Betaflight and INAV. You review flight logs, parameter files and \
screenshots of log graphs, and explain findings to pilots in clear, practical language.

Structure every report exactly like this, using these markdown markers:
### Health Check
### Vibration Analysis
### PID Tuning Assessment
### Power System
### Anomalies & Warnings
### Recommendations

Use `**Title**` lines for sub-headings and `- ` bullet points for individual findings. \
Cite concrete values (timestamps, parameter names, measured numbers) whenever the data contains them. \
Take the hardware configuration into account when judging whether a value is healthy, \
and give concrete parameter changes in the Recommendations section.

When an image is attached:
- Treat it as a screenshot of log graphs, a parameter list or a ground station screen.
- Read axis labels, units, legends and scales before interpreting a trace.
- Only report values that are visible in the image; never invent numbers.
- If the image is unreadable or unrelated to flight data, say so instead of guessing.";

/// Stands in for the log section when only an image was provided
pub const NO_LOG_PLACEHOLDER: &str = "No text log provided (see attached image).";

pub const MISSING_INPUT_MESSAGE: &str =
    "Please upload a flight log, paste log data, or attach a screenshot before starting the analysis.";

/// A fully assembled analysis request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisPrompt {
    pub system_instruction: String,
    pub message: ChatMessage,
}

pub fn has_input(log_text: &str, attachment: Option<&ImageAttachment>) -> bool {
    !log_text.trim().is_empty() || attachment.is_some()
}

pub fn render_prompt_text(hardware: &HardwareContext, log_text: &str) -> String {
    let log_section = if log_text.trim().is_empty() {
        NO_LOG_PLACEHOLDER
    } else {
        log_text
    };

    format!(
        "Analyze the following drone flight data.\n\
         \n\
         ### Hardware Configuration\n\
         - Frame Type: {}\n\
         - All-up Weight: {} kg\n\
         - Battery: {}S, {} mAh\n\
         - Motor KV: {}\n\
         - Propeller Size: {} inches\n\
         - ESC Rating: {} A\n\
         \n\
         ### Flight Log / Parameters\n\
         {}",
        hardware.frame_type,
        hardware.weight_kg,
        hardware.battery_cells,
        hardware.battery_capacity_mah,
        hardware.motor_kv,
        hardware.prop_size_in,
        hardware.esc_current_a,
        log_section,
    )
}

/// Build the user turn: one text part, then the image as inline data when attached.
///
/// Refuses with [`AnalysisError::MissingInput`] when there is nothing to analyze.
pub async fn assemble(
    hardware: &HardwareContext,
    log_text: &str,
    attachment: Option<&ImageAttachment>,
) -> Result<AnalysisPrompt, AnalysisError> {
    if !has_input(log_text, attachment) {
        return Err(AnalysisError::MissingInput);
    }

    let mut payload = ChatPayload::text(render_prompt_text(hardware, log_text));
    if let Some(image) = attachment {
        let data = image
            .base64_payload()
            .await
            .map_err(|e| AnalysisError::Attachment(e.to_string()))?;
        payload.push(ContentBlock::Image {
            data,
            mime_type: image.mime_type().to_string(),
        });
    }

    Ok(AnalysisPrompt {
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        message: ChatMessage::user(payload),
    })
}
