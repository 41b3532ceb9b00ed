use geo::Coord;

use crate::{error::PredictError, geometry::Quad, result::TextLine};

fn is_cjk(c: char) -> bool {
    let u = c as u32;
    (0x4E00..=0x9FFF).contains(&u)
        || (0x3400..=0x4DBF).contains(&u)
        || (0x3040..=0x30FF).contains(&u)
        || (0xAC00..=0xD7AF).contains(&u)
        || (0x20000..=0x2A6DF).contains(&u)
}

/// Horizontal span of every character, placed by its CTC timestep.
///
/// Latin characters extend to the midpoints between neighbouring centres;
/// CJK characters get one average character width around their centre.
fn char_spans(
    chars: &[char],
    columns: &[usize],
    seq_len: usize,
    x_min: f32,
    x_max: f32,
) -> Vec<(f32, f32)> {
    let width = x_max - x_min;
    let cell_width = width / seq_len as f32;
    let avg_char_width = width / chars.len() as f32;
    let centers = columns
        .iter()
        .map(|&column| x_min + (column as f32 + 0.5) * cell_width)
        .collect::<Vec<_>>();

    chars
        .iter()
        .enumerate()
        .map(|(i, &ch)| {
            let center = centers[i];
            if is_cjk(ch) {
                let half = avg_char_width / 2.0;
                ((center - half).max(x_min), (center + half).min(x_max))
            } else {
                let left = if i == 0 {
                    x_min
                } else {
                    (centers[i - 1] + center) / 2.0
                };
                let right = if i == centers.len() - 1 {
                    x_max
                } else {
                    (center + centers[i + 1]) / 2.0
                };
                (left.max(x_min), right.min(x_max))
            }
        })
        .collect()
}

fn quad(left: f32, right: f32, top: f32, bottom: f32) -> Quad {
    [
        Coord { x: left, y: top },
        Coord { x: right, y: top },
        Coord {
            x: right,
            y: bottom,
        },
        Coord { x: left, y: bottom },
    ]
}

/// Splits a recognized line into word tokens and their quads inside the
/// line box `[x1, y1, x2, y2]`.
///
/// Whitespace separates words and every CJK character is a token of its own.
/// `rotated` lines were recognized from a crop turned by 180 degrees, so their
/// timesteps run right to left across the page. Fails when the decoder did
/// not report one timestep per character.
pub(crate) fn split_words(
    line: &TextLine,
    corners: &[f32; 4],
    rotated: bool,
) -> Result<(Vec<String>, Vec<Quad>), PredictError> {
    let chars = line.text.chars().collect::<Vec<_>>();
    if chars.len() != line.columns.len() {
        return Err(PredictError::data_shape(format!(
            "{} characters decoded from {} timesteps",
            chars.len(),
            line.columns.len()
        )));
    }
    if chars.is_empty() || line.seq_len == 0 {
        return Ok((Vec::new(), Vec::new()));
    }

    let [x_min, top, x_max, bottom] = *corners;
    let spans = char_spans(&chars, &line.columns, line.seq_len, x_min, x_max);

    let mut tokens = Vec::new();
    let mut quads = Vec::new();
    let mut current: Option<(String, f32, f32)> = None;
    let mut flush = |current: &mut Option<(String, f32, f32)>| {
        if let Some((token, left, right)) = current.take() {
            let (left, right) = if rotated {
                (x_min + x_max - right, x_min + x_max - left)
            } else {
                (left, right)
            };
            quads.push(quad(left, right, top, bottom));
            tokens.push(token);
        }
    };

    for (&ch, &(left, right)) in chars.iter().zip(&spans) {
        if ch.is_whitespace() {
            flush(&mut current);
        } else if is_cjk(ch) {
            flush(&mut current);
            current = Some((ch.to_string(), left, right));
            flush(&mut current);
        } else {
            match &mut current {
                Some((token, _, end)) => {
                    token.push(ch);
                    *end = right;
                }
                None => current = Some((ch.to_string(), left, right)),
            }
        }
    }
    flush(&mut current);

    Ok((tokens, quads))
}
