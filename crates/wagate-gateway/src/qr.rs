// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use qrcode::QrCode;
use qrcode::render::svg;
use wagate_core::WagateError;

/// Render a QR payload as an SVG `data:` URL.
pub fn svg_data_url(payload: &str) -> Result<String, WagateError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| WagateError::Internal(format!("QR encoding failed: {e}")))?;
    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(256, 256)
        .quiet_zone(true)
        .build();
    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
}
