//! CSS colour strings as they appear in template definitions.

use crate::foundation::core::Rgba8;
use crate::foundation::error::{CardError, CardResult};

/// Fill of an unbound image field that has no background of its own.
pub const EMPTY_IMAGE_FILL: Rgba8 = Rgba8::opaque(0xe5, 0xe7, 0xeb);

/// Parse a CSS colour. The empty string and `transparent` are "no paint" and yield `None`.
pub fn parse_css_color(s: &str) -> CardResult<Option<Rgba8>> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("transparent") {
        return Ok(None);
    }
    let parsed = if let Some(hex) = s.strip_prefix('#') {
        parse_hex(hex)
    } else if let Some(args) = function_args(s, "rgba").or_else(|| function_args(s, "rgb")) {
        parse_rgb_args(args)
    } else if let Some(args) = function_args(s, "hsla").or_else(|| function_args(s, "hsl")) {
        parse_hsl_args(args)
    } else {
        named(s).ok_or_else(|| "unknown colour name".to_owned())
    };
    parsed
        .map(|c| if c.is_transparent() { None } else { Some(c) })
        .map_err(|e| CardError::validation(format!("invalid colour \"{s}\": {e}")))
}

/// Like [`parse_css_color`] but substitutes `fallback` for "no paint".
pub fn parse_css_color_or(s: &str, fallback: Rgba8) -> CardResult<Rgba8> {
    Ok(parse_css_color(s)?.unwrap_or(fallback))
}

fn function_args<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    let head = s.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    s[name.len()..]
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_hex(s: &str) -> Result<Rgba8, String> {
    fn nibble(c: u8) -> Result<u8, String> {
        (c as char)
            .to_digit(16)
            .map(|d| d as u8)
            .ok_or_else(|| format!("invalid hex digit '{}'", c as char))
    }
    let b = s.as_bytes();
    let byte = |i: usize| -> Result<u8, String> { Ok(nibble(b[i])? << 4 | nibble(b[i + 1])?) };
    let short = |i: usize| -> Result<u8, String> { Ok(nibble(b[i])? * 17) };

    match b.len() {
        3 => Ok(Rgba8::opaque(short(0)?, short(1)?, short(2)?)),
        4 => Ok(Rgba8::new(short(0)?, short(1)?, short(2)?, short(3)?)),
        6 => Ok(Rgba8::opaque(byte(0)?, byte(2)?, byte(4)?)),
        8 => Ok(Rgba8::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => Err("hex colour must have 3, 4, 6 or 8 digits".to_owned()),
    }
}

fn split_args(args: &str) -> Vec<&str> {
    args.split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect()
}

fn parse_channel(p: &str) -> Result<u8, String> {
    let v = if let Some(pct) = p.strip_suffix('%') {
        pct.parse::<f64>().map_err(|e| e.to_string())? / 100.0 * 255.0
    } else {
        p.parse::<f64>().map_err(|e| e.to_string())?
    };
    if !v.is_finite() {
        return Err("non-finite channel".to_owned());
    }
    Ok(v.round().clamp(0.0, 255.0) as u8)
}

fn parse_alpha(p: Option<&&str>) -> Result<u8, String> {
    let Some(p) = p else {
        return Ok(255);
    };
    let v = if let Some(pct) = p.strip_suffix('%') {
        pct.parse::<f64>().map_err(|e| e.to_string())? / 100.0
    } else {
        p.parse::<f64>().map_err(|e| e.to_string())?
    };
    if !v.is_finite() {
        return Err("non-finite alpha".to_owned());
    }
    Ok((v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn parse_rgb_args(args: &str) -> Result<Rgba8, String> {
    let parts = split_args(args);
    if !(3..=4).contains(&parts.len()) {
        return Err("rgb() takes 3 or 4 arguments".to_owned());
    }
    Ok(Rgba8::new(
        parse_channel(parts[0])?,
        parse_channel(parts[1])?,
        parse_channel(parts[2])?,
        parse_alpha(parts.get(3))?,
    ))
}

fn parse_hsl_args(args: &str) -> Result<Rgba8, String> {
    let parts = split_args(args);
    if !(3..=4).contains(&parts.len()) {
        return Err("hsl() takes 3 or 4 arguments".to_owned());
    }
    let num = |p: &str| -> Result<f64, String> {
        p.trim_end_matches("deg")
            .trim_end_matches('%')
            .parse::<f64>()
            .map_err(|e| e.to_string())
    };
    let h = num(parts[0])?;
    let s = num(parts[1])? / 100.0;
    let l = num(parts[2])? / 100.0;
    let [r, g, b] = hsl_to_rgb(h, s, l);
    let to_u8 = |x: f64| (x.clamp(0.0, 1.0) * 255.0).round() as u8;
    Ok(Rgba8::new(
        to_u8(r),
        to_u8(g),
        to_u8(b),
        parse_alpha(parts.get(3))?,
    ))
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> [f64; 3] {
    let h = (h % 360.0 + 360.0) % 360.0 / 360.0;
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        return [l, l, l];
    }

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 1.0 / 2.0 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    [
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    ]
}

fn named(s: &str) -> Option<Rgba8> {
    let key = s.to_ascii_lowercase();
    let i = NAMED_COLORS
        .binary_search_by(|(name, _)| (*name).cmp(key.as_str()))
        .ok()?;
    let [_, r, g, b] = NAMED_COLORS[i].1.to_be_bytes();
    Some(Rgba8::opaque(r, g, b))
}

/// CSS Color Level 4 keywords, sorted for binary search.
const NAMED_COLORS: [(&str, u32); 148] = [
    ("aliceblue", 0xf0f8ff),
    ("antiquewhite", 0xfaebd7),
    ("aqua", 0x00ffff),
    ("aquamarine", 0x7fffd4),
    ("azure", 0xf0ffff),
    ("beige", 0xf5f5dc),
    ("bisque", 0xffe4c4),
    ("black", 0x000000),
    ("blanchedalmond", 0xffebcd),
    ("blue", 0x0000ff),
    ("blueviolet", 0x8a2be2),
    ("brown", 0xa52a2a),
    ("burlywood", 0xdeb887),
    ("cadetblue", 0x5f9ea0),
    ("chartreuse", 0x7fff00),
    ("chocolate", 0xd2691e),
    ("coral", 0xff7f50),
    ("cornflowerblue", 0x6495ed),
    ("cornsilk", 0xfff8dc),
    ("crimson", 0xdc143c),
    ("cyan", 0x00ffff),
    ("darkblue", 0x00008b),
    ("darkcyan", 0x008b8b),
    ("darkgoldenrod", 0xb8860b),
    ("darkgray", 0xa9a9a9),
    ("darkgreen", 0x006400),
    ("darkgrey", 0xa9a9a9),
    ("darkkhaki", 0xbdb76b),
    ("darkmagenta", 0x8b008b),
    ("darkolivegreen", 0x556b2f),
    ("darkorange", 0xff8c00),
    ("darkorchid", 0x9932cc),
    ("darkred", 0x8b0000),
    ("darksalmon", 0xe9967a),
    ("darkseagreen", 0x8fbc8f),
    ("darkslateblue", 0x483d8b),
    ("darkslategray", 0x2f4f4f),
    ("darkslategrey", 0x2f4f4f),
    ("darkturquoise", 0x00ced1),
    ("darkviolet", 0x9400d3),
    ("deeppink", 0xff1493),
    ("deepskyblue", 0x00bfff),
    ("dimgray", 0x696969),
    ("dimgrey", 0x696969),
    ("dodgerblue", 0x1e90ff),
    ("firebrick", 0xb22222),
    ("floralwhite", 0xfffaf0),
    ("forestgreen", 0x228b22),
    ("fuchsia", 0xff00ff),
    ("gainsboro", 0xdcdcdc),
    ("ghostwhite", 0xf8f8ff),
    ("gold", 0xffd700),
    ("goldenrod", 0xdaa520),
    ("gray", 0x808080),
    ("green", 0x008000),
    ("greenyellow", 0xadff2f),
    ("grey", 0x808080),
    ("honeydew", 0xf0fff0),
    ("hotpink", 0xff69b4),
    ("indianred", 0xcd5c5c),
    ("indigo", 0x4b0082),
    ("ivory", 0xfffff0),
    ("khaki", 0xf0e68c),
    ("lavender", 0xe6e6fa),
    ("lavenderblush", 0xfff0f5),
    ("lawngreen", 0x7cfc00),
    ("lemonchiffon", 0xfffacd),
    ("lightblue", 0xadd8e6),
    ("lightcoral", 0xf08080),
    ("lightcyan", 0xe0ffff),
    ("lightgoldenrodyellow", 0xfafad2),
    ("lightgray", 0xd3d3d3),
    ("lightgreen", 0x90ee90),
    ("lightgrey", 0xd3d3d3),
    ("lightpink", 0xffb6c1),
    ("lightsalmon", 0xffa07a),
    ("lightseagreen", 0x20b2aa),
    ("lightskyblue", 0x87cefa),
    ("lightslategray", 0x778899),
    ("lightslategrey", 0x778899),
    ("lightsteelblue", 0xb0c4de),
    ("lightyellow", 0xffffe0),
    ("lime", 0x00ff00),
    ("limegreen", 0x32cd32),
    ("linen", 0xfaf0e6),
    ("magenta", 0xff00ff),
    ("maroon", 0x800000),
    ("mediumaquamarine", 0x66cdaa),
    ("mediumblue", 0x0000cd),
    ("mediumorchid", 0xba55d3),
    ("mediumpurple", 0x9370db),
    ("mediumseagreen", 0x3cb371),
    ("mediumslateblue", 0x7b68ee),
    ("mediumspringgreen", 0x00fa9a),
    ("mediumturquoise", 0x48d1cc),
    ("mediumvioletred", 0xc71585),
    ("midnightblue", 0x191970),
    ("mintcream", 0xf5fffa),
    ("mistyrose", 0xffe4e1),
    ("moccasin", 0xffe4b5),
    ("navajowhite", 0xffdead),
    ("navy", 0x000080),
    ("oldlace", 0xfdf5e6),
    ("olive", 0x808000),
    ("olivedrab", 0x6b8e23),
    ("orange", 0xffa500),
    ("orangered", 0xff4500),
    ("orchid", 0xda70d6),
    ("palegoldenrod", 0xeee8aa),
    ("palegreen", 0x98fb98),
    ("paleturquoise", 0xafeeee),
    ("palevioletred", 0xdb7093),
    ("papayawhip", 0xffefd5),
    ("peachpuff", 0xffdab9),
    ("peru", 0xcd853f),
    ("pink", 0xffc0cb),
    ("plum", 0xdda0dd),
    ("powderblue", 0xb0e0e6),
    ("purple", 0x800080),
    ("rebeccapurple", 0x663399),
    ("red", 0xff0000),
    ("rosybrown", 0xbc8f8f),
    ("royalblue", 0x4169e1),
    ("saddlebrown", 0x8b4513),
    ("salmon", 0xfa8072),
    ("sandybrown", 0xf4a460),
    ("seagreen", 0x2e8b57),
    ("seashell", 0xfff5ee),
    ("sienna", 0xa0522d),
    ("silver", 0xc0c0c0),
    ("skyblue", 0x87ceeb),
    ("slateblue", 0x6a5acd),
    ("slategray", 0x708090),
    ("slategrey", 0x708090),
    ("snow", 0xfffafa),
    ("springgreen", 0x00ff7f),
    ("steelblue", 0x4682b4),
    ("tan", 0xd2b48c),
    ("teal", 0x008080),
    ("thistle", 0xd8bfd8),
    ("tomato", 0xff6347),
    ("turquoise", 0x40e0d0),
    ("violet", 0xee82ee),
    ("wheat", 0xf5deb3),
    ("white", 0xffffff),
    ("whitesmoke", 0xf5f5f5),
    ("yellow", 0xffff00),
    ("yellowgreen", 0x9acd32),
];

#[cfg(test)]
#[path = "../../tests/unit/assets/color.rs"]
mod tests;
