/// Width and height used when a request carries no usable size.
pub const DEFAULT_SIZE: (u32, u32) = (1024, 1024);

/// Parses an OpenAI-style size string such as `"1024x768"` into `(width, height)`.
///
/// Parsing is lenient: absent, empty or malformed input (wrong number of `x`
/// separators, non-numeric parts, zero) yields `default` instead of an error.
pub fn parse_size(size: Option<&str>, default: (u32, u32)) -> (u32, u32) {
    let Some(size) = size.filter(|s| !s.is_empty()) else {
        return default;
    };

    let lowered = size.to_lowercase();
    let parts: Vec<&str> = lowered.split('x').collect();
    if parts.len() != 2 {
        return default;
    }

    match (parts[0].trim().parse::<u32>(), parts[1].trim().parse::<u32>()) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
        _ => default,
    }
}
