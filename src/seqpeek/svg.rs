//! SVG drawing of a [`Scene`].

use std::borrow::Cow;
use std::fmt::{self, Write};

use crate::seqpeek::render::{Glyph, Scene, TrackNode, REFERENCE_LINE_STROKE, STEM_STROKE};

/// Escape text for use in XML content and attribute values.
fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut result = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Draw `scene` as a standalone SVG document.
///
/// The document mirrors the final state of the scene; transitions are not represented.
pub fn to_svg(scene: &Scene) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}">"#,
        scene.size.width, scene.size.height
    )?;

    let area = scene.label_area;
    writeln!(
        out,
        r#"<g class="label-area" transform="translate({},{})">"#,
        area.x, area.y
    )?;
    for track in &scene.tracks {
        writeln!(
            out,
            r#"<g class="seqpeek-track" transform="{}"><text y="{}">{}</text></g>"#,
            track.transform,
            track.label_y,
            escape(&track.label)
        )?;
    }
    writeln!(out, "</g>")?;

    let area = scene.panel_area;
    writeln!(
        out,
        r#"<g class="panel-area" transform="translate({},{})">"#,
        area.x, area.y
    )?;
    for track in &scene.tracks {
        write_panel(&mut out, track)?;
    }
    writeln!(out, "</g>")?;

    let area = scene.data_area;
    writeln!(
        out,
        r#"<svg class="data-area" x="{}" y="{}" width="{}" height="{}">"#,
        area.x, area.y, area.width, area.height
    )?;
    for track in &scene.tracks {
        write_data(&mut out, track)?;
    }
    writeln!(out, "</svg>")?;

    writeln!(out, "</svg>")?;
    Ok(out)
}

fn write_panel(out: &mut String, track: &TrackNode) -> fmt::Result {
    writeln!(
        out,
        r#"<g class="seqpeek-track" transform="{}">"#,
        track.transform
    )?;

    let background = &track.background_ticks;
    writeln!(
        out,
        r#"<g class="background-ticks" transform="{}">"#,
        background.transform
    )?;
    for tick in &background.ticks {
        writeln!(
            out,
            r#"<g class="loc-tick" transform="translate({},0)"><line y1="{}" y2="{}" stroke-width="1" stroke="{}"/></g>"#,
            tick.x, background.span.y1, background.span.y2, REFERENCE_LINE_STROKE
        )?;
    }
    writeln!(out, "</g>")?;

    if let Some(scale) = &track.scale {
        writeln!(out, r#"<g class="scale" transform="{}">"#, scale.transform)?;
        if let Some(line) = &scale.line {
            writeln!(
                out,
                r#"<line class="protein-scale" x1="{}" x2="{}" y1="{}" y2="{}" stroke="black"/>"#,
                line.x1, line.x2, line.y, line.y
            )?;
        }
        for tick in &scale.ticks {
            writeln!(
                out,
                r#"<g class="loc-tick" transform="translate({},0)"><text text-anchor="middle" y="0">{}</text></g>"#,
                tick.x, tick.value
            )?;
        }
        writeln!(out, "</g>")?;
    }

    writeln!(out, "</g>")
}

fn write_data(out: &mut String, track: &TrackNode) -> fmt::Result {
    writeln!(
        out,
        r#"<g class="seqpeek-track" transform="{}">"#,
        track.transform
    )?;

    if let Some(domains) = &track.domains {
        writeln!(out, r#"<g class="domains" transform="{}">"#, domains.transform)?;
        for rect in &domains.rects {
            writeln!(
                out,
                r#"<g class="match {}" transform="translate(0,{})"><rect class="domain-location" x="{}" width="{}" height="{}" vector-effect="non-scaling-stroke"><title>{}</title></rect></g>"#,
                escape(&rect.dbname),
                rect.y,
                rect.x,
                rect.width,
                rect.height,
                escape(&rect.name)
            )?;
        }
        writeln!(out, "</g>")?;
    }

    let mutations = &track.mutations;
    writeln!(
        out,
        r#"<g class="mutations" transform="{}">"#,
        mutations.transform
    )?;
    for stem in &mutations.stems {
        writeln!(
            out,
            r#"<path class="stem" d="{}" fill="none" stroke="{}" stroke-width="{}" vector-effect="non-scaling-stroke"><title>{}</title></path>"#,
            stem.path,
            STEM_STROKE,
            stem.stroke_width,
            escape(&stem.title)
        )?;
    }
    for group in &mutations.groups {
        writeln!(
            out,
            r#"<g class="mutation group" transform="translate({},0)">"#,
            group.x
        )?;
        for mutation in &group.mutations {
            writeln!(
                out,
                r#"<g class="mutation-type" transform="translate({},{})" fill="{}">"#,
                mutation.x,
                mutation.y,
                escape(&mutation.fill)
            )?;
            for glyph in &mutation.glyphs {
                match glyph {
                    Glyph::Circle { cy, r, .. } => writeln!(
                        out,
                        r#"<circle class="mutation" r="{}" cx="0" cy="{}"/>"#,
                        r, cy
                    )?,
                    Glyph::Bar {
                        x,
                        y,
                        width,
                        height,
                        fill,
                        ..
                    } => writeln!(
                        out,
                        r#"<rect class="mutation" x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                        x,
                        y,
                        width,
                        height,
                        escape(fill)
                    )?,
                }
            }
            writeln!(out, "</g>")?;
        }
        writeln!(out, "</g>")?;
    }
    writeln!(out, "</g>")?;

    writeln!(out, "</g>")
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::seqpeek::render::{
        Area, BackgroundTicks, GroupNode, MutationNode, MutationsNode, StemNode, Transform,
    };
    use crate::seqpeek::track_layout::{Size, TickSpan};
    use crate::seqpeek::viewport::ViewportState;

    fn scene() -> Scene {
        let area = Area {
            x: 110.0,
            y: 10.0,
            width: 1000.0,
            height: 100.0,
        };
        Scene {
            size: Size::new(1120.0, 120.0),
            label_area: Area { x: 10.0, ..area },
            panel_area: area,
            data_area: area,
            viewport: ViewportState::default(),
            tracks: vec![TrackNode {
                label: "A&B".into(),
                transform: Transform::translate(0.0, 0.0),
                height: 100.0,
                label_y: 37.0,
                background_ticks: BackgroundTicks {
                    transform: Transform::translate(0.0, 60.0),
                    span: TickSpan { y1: -60.0, y2: 0.0 },
                    ticks: Vec::new(),
                },
                scale: None,
                domains: None,
                mutations: MutationsNode {
                    transform: Transform::translate(0.0, 60.0).with_scale(1.0, -1.0),
                    groups: vec![GroupNode {
                        location: 100,
                        x: 95.0,
                        mutations: vec![MutationNode {
                            mutation_id: "m1".into(),
                            x: 5.0,
                            y: 30.0,
                            fill: "lightgray".into(),
                            glyphs: vec![Glyph::Circle {
                                sample_id: "S1".into(),
                                cy: 0.0,
                                r: 5.0,
                            }],
                        }],
                    }],
                    stems: vec![StemNode {
                        location: 100,
                        mutation_id: "m1".into(),
                        path: "M100,0C100,10.5 100,10.5 100,21".into(),
                        title: "Type - <none>".into(),
                        stroke_width: 1.0,
                    }],
                },
            }],
        }
    }

    #[test]
    fn escape_text() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape(r#"a<b & "c""#), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn draws_elements() -> Result<(), anyhow::Error> {
        let svg = to_svg(&scene())?;

        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="1120" height="120">"#));
        assert!(svg.contains(r#"<text y="37">A&amp;B</text>"#));
        assert!(svg.contains(r#"<g class="mutations" transform="translate(0,60) scale(1,-1)">"#));
        assert!(svg.contains(r#"<g class="mutation group" transform="translate(95,0)">"#));
        assert!(svg.contains(r#"<circle class="mutation" r="5" cx="0" cy="0"/>"#));
        assert!(svg.contains("<title>Type - &lt;none&gt;</title>"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<svg").count(), svg.matches("</svg>").count());

        Ok(())
    }
}
