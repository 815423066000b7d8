//! Filter-graph arena.
//!
//! Components never talk to the engine directly; they append inputs and
//! filter nodes to a [`FilterGraph`] and pass typed [`VideoNode`] /
//! [`AudioNode`] handles around. The graph is rendered into engine arguments
//! only when a supervised run is about to start, and only the nodes
//! reachable from the requested outputs are emitted.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{ReelcutError, ReelcutResult};

/// Format a time value the way the engine expects it
pub fn format_seconds(value: f64) -> String {
    if value == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    format!("{}", value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum StreamKind {
    Video,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Pad {
    Input { input: usize, kind: StreamKind },
    Node(usize),
}

/// Handle to a video stream inside a [`FilterGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoNode(Pad);

/// Handle to an audio stream inside a [`FilterGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioNode(Pad);

/// Index of an input declared on a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputId(usize);

/// One `-i` input together with the options that precede it
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInput {
    options: Vec<String>,
    source: String,
}

impl MediaInput {
    /// A plain file input
    pub fn file(path: impl AsRef<std::path::Path>) -> Self {
        Self {
            options: Vec::new(),
            source: path.as_ref().to_string_lossy().into_owned(),
        }
    }

    /// A lavfi source such as `anullsrc=...`
    pub fn lavfi(source: impl Into<String>) -> Self {
        Self {
            options: vec!["-f".to_string(), "lavfi".to_string()],
            source: source.into(),
        }
    }

    /// Input-side seek to `[start, end]`
    pub fn range(self, start: f64, end: f64) -> Self {
        self.option("-ss", format_seconds(start))
            .option("-to", format_seconds(end))
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(key.into());
        self.options.push(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FilterArg {
    Positional(String),
    Named(String, String),
}

/// A single filter with its arguments, e.g. `xfade=transition=fade:duration=1`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    name: String,
    args: Vec<FilterArg>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl ToString) -> Self {
        self.args.push(FilterArg::Positional(value.to_string()));
        self
    }

    pub fn named(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.args.push(FilterArg::Named(key.into(), value.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of a named argument, if set
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.iter().find_map(|arg| match arg {
            FilterArg::Named(k, v) if k == key => Some(v.as_str()),
            _ => None,
        })
    }
}

fn escape_value(value: &str) -> String {
    if value.chars().any(|c| matches!(c, ':' | ',' | ';' | '[' | ']' | '\'' | '\\' | ' ')) {
        format!("'{}'", value.replace('\'', "'\\''"))
    } else {
        value.to_string()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            match arg {
                FilterArg::Positional(v) => f.write_str(&escape_value(v))?,
                FilterArg::Named(k, v) => write!(f, "{}={}", k, escape_value(v))?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Node {
    filter: Filter,
    inputs: Vec<Pad>,
    kind: StreamKind,
}

/// An output requested from a rendered graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPad {
    Video(VideoNode),
    Audio(AudioNode),
}

impl OutputPad {
    fn pad(&self) -> Pad {
        match self {
            OutputPad::Video(v) => v.0,
            OutputPad::Audio(a) => a.0,
        }
    }
}

/// Engine arguments produced from a graph
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedGraph {
    pub input_args: Vec<String>,
    pub filter_complex: Option<String>,
    pub maps: Vec<String>,
}

impl RenderedGraph {
    /// Inputs, filter graph and `-map` arguments in engine order
    pub fn to_args(&self) -> Vec<String> {
        let mut args = self.input_args.clone();
        if let Some(filter) = &self.filter_complex {
            args.push("-filter_complex".to_string());
            args.push(filter.clone());
        }
        for map in &self.maps {
            args.push("-map".to_string());
            args.push(map.clone());
        }
        args
    }
}

/// Arena of inputs and filter nodes
#[derive(Debug, Clone, Default)]
pub struct FilterGraph {
    inputs: Vec<MediaInput>,
    nodes: Vec<Node>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, input: MediaInput) -> InputId {
        self.inputs.push(input);
        InputId(self.inputs.len() - 1)
    }

    pub fn video_of(&self, input: InputId) -> VideoNode {
        VideoNode(Pad::Input {
            input: input.0,
            kind: StreamKind::Video,
        })
    }

    pub fn audio_of(&self, input: InputId) -> AudioNode {
        AudioNode(Pad::Input {
            input: input.0,
            kind: StreamKind::Audio,
        })
    }

    /// Append a single-input video filter
    pub fn video(&mut self, from: VideoNode, filter: Filter) -> VideoNode {
        VideoNode(self.push(filter, vec![from.0], StreamKind::Video))
    }

    /// Append a single-input audio filter
    pub fn audio(&mut self, from: AudioNode, filter: Filter) -> AudioNode {
        AudioNode(self.push(filter, vec![from.0], StreamKind::Audio))
    }

    /// Append a two-input video filter such as `xfade`
    pub fn join_video(&mut self, first: VideoNode, second: VideoNode, filter: Filter) -> VideoNode {
        VideoNode(self.push(filter, vec![first.0, second.0], StreamKind::Video))
    }

    /// Append a two-input audio filter such as `acrossfade`
    pub fn join_audio(&mut self, first: AudioNode, second: AudioNode, filter: Filter) -> AudioNode {
        AudioNode(self.push(filter, vec![first.0, second.0], StreamKind::Audio))
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Filter that produced `node`, if it is not a raw input stream
    pub fn audio_filter(&self, node: AudioNode) -> Option<&Filter> {
        self.filter_at(node.0)
    }

    /// Filter that produced `node`, if it is not a raw input stream
    pub fn video_filter(&self, node: VideoNode) -> Option<&Filter> {
        self.filter_at(node.0)
    }

    fn filter_at(&self, pad: Pad) -> Option<&Filter> {
        match pad {
            Pad::Node(index) => self.nodes.get(index).map(|n| &n.filter),
            Pad::Input { .. } => None,
        }
    }

    fn push(&mut self, filter: Filter, inputs: Vec<Pad>, kind: StreamKind) -> Pad {
        self.nodes.push(Node {
            filter,
            inputs,
            kind,
        });
        Pad::Node(self.nodes.len() - 1)
    }

    fn label(pad: Pad, nodes: &[Node]) -> String {
        match pad {
            Pad::Input {
                input,
                kind: StreamKind::Video,
            } => format!("{}:v:0", input),
            Pad::Input {
                input,
                kind: StreamKind::Audio,
            } => format!("{}:a:0", input),
            Pad::Node(index) => match nodes[index].kind {
                StreamKind::Video => format!("v{}", index),
                StreamKind::Audio => format!("a{}", index),
            },
        }
    }

    /// Render the part of the graph feeding `outputs`
    pub fn render(&self, outputs: &[OutputPad]) -> ReelcutResult<RenderedGraph> {
        if outputs.is_empty() {
            return Err(ReelcutError::invalid("No graph outputs requested"));
        }

        let mut reachable = BTreeSet::new();
        let mut stack: Vec<Pad> = outputs.iter().map(OutputPad::pad).collect();
        while let Some(pad) = stack.pop() {
            match pad {
                Pad::Node(index) => {
                    let node = self.nodes.get(index).ok_or_else(|| {
                        ReelcutError::invalid(format!("Unknown graph node {}", index))
                    })?;
                    if reachable.insert(index) {
                        stack.extend(node.inputs.iter().copied());
                    }
                }
                Pad::Input { input, .. } => {
                    if input >= self.inputs.len() {
                        return Err(ReelcutError::invalid(format!(
                            "Unknown graph input {}",
                            input
                        )));
                    }
                }
            }
        }

        // every pad feeds exactly one consumer; the engine has no implicit split
        let mut consumed = BTreeSet::new();
        let consumers = reachable
            .iter()
            .flat_map(|&i| self.nodes[i].inputs.iter().copied())
            .chain(outputs.iter().map(OutputPad::pad));
        for pad in consumers {
            if !consumed.insert(pad) {
                return Err(ReelcutError::invalid(format!(
                    "Graph stream [{}] is consumed more than once",
                    Self::label(pad, &self.nodes)
                )));
            }
        }

        let mut input_args = Vec::new();
        for input in &self.inputs {
            input_args.extend(input.options.iter().cloned());
            input_args.push("-i".to_string());
            input_args.push(input.source.clone());
        }

        // nodes only reference lower indices, so index order is topological
        let chains: Vec<String> = reachable
            .iter()
            .map(|&index| {
                let node = &self.nodes[index];
                let ins: String = node
                    .inputs
                    .iter()
                    .map(|p| format!("[{}]", Self::label(*p, &self.nodes)))
                    .collect();
                format!(
                    "{}{}[{}]",
                    ins,
                    node.filter,
                    Self::label(Pad::Node(index), &self.nodes)
                )
            })
            .collect();

        let maps = outputs
            .iter()
            .map(|output| match output.pad() {
                pad @ Pad::Node(_) => format!("[{}]", Self::label(pad, &self.nodes)),
                pad => Self::label(pad, &self.nodes),
            })
            .collect();

        Ok(RenderedGraph {
            input_args,
            filter_complex: if chains.is_empty() {
                None
            } else {
                Some(chains.join(";"))
            },
            maps,
        })
    }
}
