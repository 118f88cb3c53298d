use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use memmap2::Mmap;
use ndarray::Array2;

use crate::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};
use crate::error::{GanymedeError, Result};
use crate::frame::Exposure;
use crate::io::header::{Header, HeaderValue};

/// Cards regenerated on write and therefore dropped on read.
const STRUCTURAL_KEYWORDS: [&str; 7] = [
    "SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "BZERO", "BSCALE",
];

/// Read a single-HDU 2-D FITS image from disk.
pub fn read_fits(path: &Path) -> Result<Exposure> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    decode_fits(&mmap)
}

/// Decode a primary HDU, converting pixels to f32 with BZERO/BSCALE applied.
pub fn decode_fits(bytes: &[u8]) -> Result<Exposure> {
    if bytes.len() < FITS_BLOCK_SIZE {
        return Err(GanymedeError::InvalidFits(
            "File too small for a FITS header block".into(),
        ));
    }
    if !bytes.starts_with(b"SIMPLE  =") {
        return Err(GanymedeError::InvalidFits("Missing SIMPLE keyword".into()));
    }

    let (raw, data_offset) = parse_header_cards(bytes)?;

    let bitpix = required_int(&raw, "BITPIX")?;
    let naxis = required_int(&raw, "NAXIS")?;
    if naxis != 2 {
        return Err(GanymedeError::InvalidFits(format!(
            "Expected a 2-D image, NAXIS = {naxis}"
        )));
    }
    let width = dimension(&raw, "NAXIS1")?;
    let height = dimension(&raw, "NAXIS2")?;
    let bzero = raw.get_f64("BZERO").unwrap_or(0.0);
    let bscale = raw.get_f64("BSCALE").unwrap_or(1.0);

    let bytes_per_pixel = match bitpix {
        8 => 1,
        16 => 2,
        32 | -32 => 4,
        -64 => 8,
        other => {
            return Err(GanymedeError::InvalidFits(format!(
                "Unsupported BITPIX {other}"
            )))
        }
    };

    let too_large = || GanymedeError::InvalidFits("Image dimensions too large".into());
    let n = width.checked_mul(height).ok_or_else(too_large)?;
    let data_end = n
        .checked_mul(bytes_per_pixel)
        .and_then(|b| b.checked_add(data_offset))
        .ok_or_else(too_large)?;
    if bytes.len() < data_end {
        return Err(GanymedeError::InvalidFits(format!(
            "File truncated: expected at least {} bytes, got {}",
            data_end,
            bytes.len()
        )));
    }

    let pixels = decode_pixels(&bytes[data_offset..data_end], bitpix, n, bzero, bscale);
    let data = Array2::from_shape_vec((height, width), pixels)
        .map_err(|e| GanymedeError::InvalidFits(e.to_string()))?;

    let mut header = raw;
    for key in STRUCTURAL_KEYWORDS {
        header.remove(key);
    }

    Ok(Exposure::new(data, header))
}

/// Write an exposure as BITPIX -32, creating or truncating `path`.
pub fn write_fits(path: &Path, exposure: &Exposure, create_new: bool) -> Result<()> {
    let file = if create_new {
        File::options().write(true).create_new(true).open(path)?
    } else {
        File::create(path)?
    };
    let mut writer = BufWriter::new(file);
    encode_fits(&mut writer, exposure)?;
    writer.flush()?;
    Ok(())
}

/// Encode an exposure as a single primary HDU.
pub fn encode_fits(w: &mut impl Write, exposure: &Exposure) -> Result<()> {
    let mut cards = vec![
        format_card("SIMPLE", &HeaderValue::Logical(true), Some("conforms to FITS standard")),
        format_card("BITPIX", &HeaderValue::Integer(-32), Some("IEEE single precision")),
        format_card("NAXIS", &HeaderValue::Integer(2), None),
        format_card("NAXIS1", &HeaderValue::Integer(exposure.width() as i64), None),
        format_card("NAXIS2", &HeaderValue::Integer(exposure.height() as i64), None),
    ];
    for (key, card) in exposure.header.cards() {
        if STRUCTURAL_KEYWORDS.contains(&key) {
            continue;
        }
        cards.push(format_card(key, &card.value, card.comment.as_deref()));
    }
    for (key, text) in exposure.header.commentary() {
        cards.push(pad_card(format!("{key:<8}{text}")));
    }
    cards.push(pad_card("END".to_string()));

    let mut written = 0;
    for card in &cards {
        w.write_all(card.as_bytes())?;
        written += FITS_CARD_SIZE;
    }
    write_padding(w, written, b' ')?;

    for &value in exposure.data.iter() {
        w.write_f32::<BigEndian>(value)?;
    }
    write_padding(w, exposure.pixel_count() * 4, 0)?;
    Ok(())
}

fn write_padding(w: &mut impl Write, written: usize, fill: u8) -> Result<()> {
    let padding = (FITS_BLOCK_SIZE - written % FITS_BLOCK_SIZE) % FITS_BLOCK_SIZE;
    w.write_all(&vec![fill; padding])?;
    Ok(())
}

/// Parse cards up to END, returning the header and the offset of the data unit.
fn parse_header_cards(bytes: &[u8]) -> Result<(Header, usize)> {
    let mut header = Header::new();

    for (index, card) in bytes.chunks_exact(FITS_CARD_SIZE).enumerate() {
        let card: String = card
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { '?' })
            .collect();
        let keyword = card[..8].trim_end();

        if keyword == "END" {
            let header_bytes = (index + 1) * FITS_CARD_SIZE;
            let data_offset = header_bytes.div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE;
            return Ok((header, data_offset));
        }

        if keyword == "COMMENT" || keyword == "HISTORY" {
            header.push_commentary(keyword, card[8..].trim_end());
            continue;
        }

        if keyword.is_empty() || &card[8..10] != "= " {
            continue;
        }

        let (value, comment) = parse_value(&card[10..])?;
        match comment {
            Some(comment) => header.set_with_comment(keyword, value, &comment),
            None => header.set(keyword, value),
        }
    }

    Err(GanymedeError::InvalidFits("Header has no END card".into()))
}

fn parse_value(field: &str) -> Result<(HeaderValue, Option<String>)> {
    let trimmed = field.trim_start();

    if let Some(rest) = trimmed.strip_prefix('\'') {
        // Quotes inside a string are doubled.
        let mut text = String::new();
        let mut chars = rest.chars().peekable();
        loop {
            match chars.next() {
                Some('\'') if chars.peek() == Some(&'\'') => {
                    chars.next();
                    text.push('\'');
                }
                Some('\'') => break,
                Some(c) => text.push(c),
                None => {
                    return Err(GanymedeError::InvalidFits(format!(
                        "Unterminated string value: {field}"
                    )))
                }
            }
        }
        let remainder: String = chars.collect();
        return Ok((
            HeaderValue::Text(text.trim_end().to_string()),
            inline_comment(&remainder),
        ));
    }

    let (value_part, comment) = match trimmed.find('/') {
        Some(idx) => (trimmed[..idx].trim(), inline_comment(&trimmed[idx..])),
        None => (trimmed.trim(), None),
    };

    let value = match value_part {
        "T" => HeaderValue::Logical(true),
        "F" => HeaderValue::Logical(false),
        _ => {
            if let Ok(i) = value_part.parse::<i64>() {
                HeaderValue::Integer(i)
            } else if let Ok(f) = value_part.replace(['D', 'd'], "E").parse::<f64>() {
                HeaderValue::Float(f)
            } else {
                HeaderValue::Text(value_part.to_string())
            }
        }
    };
    Ok((value, comment))
}

fn inline_comment(remainder: &str) -> Option<String> {
    remainder
        .trim()
        .strip_prefix('/')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

fn required_int(header: &Header, key: &str) -> Result<i64> {
    header
        .get_i64(key)
        .ok_or_else(|| GanymedeError::InvalidFits(format!("Missing {key}")))
}

fn dimension(header: &Header, key: &str) -> Result<usize> {
    let value = required_int(header, key)?;
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| GanymedeError::InvalidFits(format!("Invalid {key} = {value}")))
}

fn decode_pixels(raw: &[u8], bitpix: i64, n: usize, bzero: f64, bscale: f64) -> Vec<f32> {
    let scale = |v: f64| (v * bscale + bzero) as f32;
    match bitpix {
        8 => raw.iter().map(|&v| scale(v as f64)).collect(),
        16 => {
            let mut buf = vec![0i16; n];
            BigEndian::read_i16_into(raw, &mut buf);
            buf.into_iter().map(|v| scale(v as f64)).collect()
        }
        32 => {
            let mut buf = vec![0i32; n];
            BigEndian::read_i32_into(raw, &mut buf);
            buf.into_iter().map(|v| scale(v as f64)).collect()
        }
        -32 => {
            let mut buf = vec![0f32; n];
            BigEndian::read_f32_into(raw, &mut buf);
            if bzero == 0.0 && bscale == 1.0 {
                buf
            } else {
                buf.into_iter().map(|v| scale(v as f64)).collect()
            }
        }
        _ => {
            let mut buf = vec![0f64; n];
            BigEndian::read_f64_into(raw, &mut buf);
            buf.into_iter().map(scale).collect()
        }
    }
}

fn format_card(key: &str, value: &HeaderValue, comment: Option<&str>) -> String {
    let value_field = match value {
        HeaderValue::Text(s) => {
            let escaped = s.replace('\'', "''");
            format!("'{escaped:<8}'")
        }
        HeaderValue::Integer(i) => format!("{i:>20}"),
        HeaderValue::Float(f) => format!("{:>20}", format_float(*f)),
        HeaderValue::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
    };
    let mut card = format!("{key:<8}= {value_field}");
    if let Some(comment) = comment {
        card.push_str(" / ");
        card.push_str(comment);
    }
    pad_card(card)
}

fn format_float(f: f64) -> String {
    // Debug formatting always keeps a decimal point or exponent.
    format!("{f:?}").to_uppercase()
}

fn pad_card(mut card: String) -> String {
    card.truncate(FITS_CARD_SIZE);
    format!("{card:<80}")
}
