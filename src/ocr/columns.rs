use super::TextBlock;

/// Blocks taller than 1.5x their width are treated as vertical text; wider
/// artifacts (furigana rows, horizontal UI chrome) are dropped.
const VERTICAL_RATIO_THRESHOLD: f32 = 1.5;
/// Anything starting in the top 15% of the page is a header or title.
const HEADER_ZONE_PERCENT: f32 = 0.15;
/// Horizontal distance within which a block joins an existing column.
const COLUMN_GROUPING_THRESHOLD: i32 = 50;

struct VerticalBlock<'a> {
    text: &'a str,
    center_x: i32,
    top: i32,
}

/// Rebuilds reading-ordered prose from unordered OCR blocks of a vertical
/// Japanese page: columns right to left, blocks top to bottom within a
/// column. Pure and deterministic; blocks failing the header or orientation
/// filter are silently excluded and an empty result is not an error.
pub fn reconstruct_columns(blocks: &[TextBlock], image_height: i32) -> String {
    let header_zone_limit = (image_height as f32 * HEADER_ZONE_PERCENT) as i32;
    let mut vertical = Vec::new();

    for block in blocks {
        let bbox = &block.bounding_box;
        if bbox.top < header_zone_limit {
            continue;
        }
        let aspect = bbox.height as f32 / bbox.width as f32;
        if aspect < VERTICAL_RATIO_THRESHOLD {
            continue;
        }
        vertical.push(VerticalBlock {
            text: &block.text,
            center_x: bbox.center_x(),
            top: bbox.top,
        });
    }

    if vertical.is_empty() {
        return String::new();
    }
    build_text(vertical)
}

fn build_text(mut blocks: Vec<VerticalBlock<'_>>) -> String {
    // Rightmost first so column seeds follow reading order; ties keep
    // insertion order (first matching column wins).
    blocks.sort_by(|a, b| b.center_x.cmp(&a.center_x));

    let mut columns: Vec<Vec<VerticalBlock<'_>>> = Vec::new();
    for block in blocks {
        let slot = columns.iter().position(|column| {
            let mean: i64 = column.iter().map(|member| member.center_x as i64).sum::<i64>()
                / column.len() as i64;
            (block.center_x as i64 - mean).abs() < COLUMN_GROUPING_THRESHOLD as i64
        });
        match slot {
            Some(index) => columns[index].push(block),
            None => columns.push(vec![block]),
        }
    }

    columns.sort_by_key(|column| {
        let max = column.iter().map(|member| member.center_x).max().unwrap_or(0);
        std::cmp::Reverse(max)
    });

    let mut result = String::new();
    let column_count = columns.len();
    for (index, column) in columns.iter_mut().enumerate() {
        column.sort_by_key(|member| member.top);
        for block in column.iter() {
            for line in block.text.lines() {
                result.push_str(line);
            }
        }
        if index < column_count - 1 {
            result.push('\n');
        }
    }

    result.trim().to_string()
}
