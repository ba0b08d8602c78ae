//! The boundary between the interpreter and the CAD application embedding it.
//!
//! Effectful builtins (`command`, `entmake`, `getvar`, `ssget`, ...) marshal their
//! arguments and call a [`HostBridge`]. Entity and selection-set references are
//! opaque integer handles owned by the host.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

use hashbrown::HashMap;

use crate::error::LispError;
use crate::value::Value;

/// A typed system variable value.
#[derive(Debug, Clone, PartialEq)]
pub enum SysVar {
    Int(i64),
    Real(f64),
    Point(Vec<f64>),
    Str(String),
}

/// A 3D point as exchanged with the host. 2D input has `z = 0.0`.
pub type Point = [f64; 3];

/// Operations the embedding application provides to scripts.
///
/// Every method has a default that behaves like an empty drawing with no
/// interactive user, so hosts implement only what they support.
pub trait HostBridge {
    /// Run a command line assembled from the script's arguments.
    fn command(&self, tokens: &[String]) -> Result<(), LispError> {
        Err(LispError::host(format!(
            "no host available to run command: {}",
            tokens.join(" ")
        )))
    }

    /// Create an entity from a group-code association list.
    fn entmake(&self, _data: &[Value]) -> Option<u64> {
        None
    }

    /// The association list describing an entity.
    fn entget(&self, _ent: u64) -> Option<Vec<Value>> {
        None
    }

    fn entmod(&self, _ent: u64, _data: &[Value]) -> bool {
        false
    }

    fn entdel(&self, _ent: u64) -> bool {
        false
    }

    fn entlast(&self) -> Option<u64> {
        None
    }

    /// The entity after `after`, or the first entity when `after` is `None`.
    fn entnext(&self, _after: Option<u64>) -> Option<u64> {
        None
    }

    fn getvar(&self, _name: &str) -> Option<SysVar> {
        None
    }

    fn setvar(&self, name: &str, _value: SysVar) -> Result<SysVar, LispError> {
        Err(LispError::host(format!("setvar: unknown variable {name}")))
    }

    /// Build a selection set. `mode` is the AutoLISP selection method string and
    /// `filter` an association list every selected entity must match.
    fn ssget(&self, _mode: Option<&str>, _filter: Option<&[Value]>) -> Option<u64> {
        None
    }

    /// Add `ent` to `set`, creating a new set when `set` is `None`.
    fn ssadd(&self, _ent: Option<u64>, _set: Option<u64>) -> Option<u64> {
        None
    }

    fn ssdel(&self, _ent: u64, _set: u64) -> bool {
        false
    }

    fn sslength(&self, _set: u64) -> Option<usize> {
        None
    }

    fn ssname(&self, _set: u64, _index: usize) -> Option<u64> {
        None
    }

    fn alert(&self, message: &str) {
        eprintln!("{message}");
    }

    // Interactive input. `None` means the user cancelled or nobody is there to ask.

    /// Input control for the next `get*` call: `bits` restricts the reply,
    /// `keywords` is a space separated list `getkword` accepts.
    fn initget(&self, _bits: i64, _keywords: &str) {}

    fn getint(&self, _prompt: &str) -> Option<i64> {
        None
    }

    fn getreal(&self, _prompt: &str) -> Option<f64> {
        None
    }

    /// `allow_spaces` lets the reply contain blanks; otherwise space ends it.
    fn getstring(&self, _prompt: &str, _allow_spaces: bool) -> Option<String> {
        None
    }

    fn getpoint(&self, _prompt: &str, _base: Option<Point>) -> Option<Point> {
        None
    }

    /// The opposite corner of a rectangle starting at `base`.
    fn getcorner(&self, _prompt: &str, _base: Point) -> Option<Point> {
        None
    }

    fn getdist(&self, _prompt: &str, _base: Option<Point>) -> Option<f64> {
        None
    }

    /// An angle in radians, measured from the current angle base.
    fn getangle(&self, _prompt: &str, _base: Option<Point>) -> Option<f64> {
        None
    }

    /// An angle in radians measured from east, counter-clockwise, regardless
    /// of the drawing's angle base and direction.
    fn getorient(&self, prompt: &str, base: Option<Point>) -> Option<f64> {
        self.getangle(prompt, base)
    }

    /// One of the keywords set by the last `initget`.
    fn getkword(&self, _prompt: &str) -> Option<String> {
        None
    }

    /// An entity picked by the user and the point used to pick it.
    fn entsel(&self, _prompt: &str) -> Option<(u64, Point)> {
        None
    }

    /// A file name from a file dialog.
    fn getfiled(&self, _title: &str, _default: &str, _ext: &str, _flags: i64) -> Option<String> {
        None
    }

    // Dialogs.

    /// Load a dialog definition file, returning its handle.
    fn load_dialog(&self, _path: &str) -> Option<i64> {
        None
    }

    fn unload_dialog(&self, _id: i64) {}

    /// Open the dialog `name` from a loaded definition.
    fn new_dialog(&self, _name: &str, _id: i64) -> bool {
        false
    }

    fn set_tile(&self, _key: &str, _value: &str) -> bool {
        false
    }

    fn get_tile(&self, _key: &str) -> Option<String> {
        None
    }

    /// `mode` is 0 enable, 1 disable, 2 focus, 3 select, 4 flip highlight.
    fn mode_tile(&self, _key: &str, _mode: i64) -> bool {
        false
    }

    /// Attach an expression, as source text, to run when the tile is activated.
    fn action_tile(&self, _key: &str, _action: &str) -> bool {
        false
    }

    /// Show the open dialog until it is dismissed, returning the status passed
    /// to `done_dialog`.
    fn start_dialog(&self) -> Option<i64> {
        None
    }

    /// Close the open dialog. Returns where it was on screen.
    fn done_dialog(&self, _status: Option<i64>) -> Option<(i64, i64)> {
        None
    }

    /// Close every open dialog.
    fn term_dialog(&self) {}

    fn prompt(&self, message: &str) {
        print!("{message}");
    }
}

/// A host with no drawing attached.
#[derive(Debug, Default)]
pub struct NullHost;

impl HostBridge for NullHost {}

/// Group code of an association list entry such as `(0 . "LINE")` or `(10 1.0 2.0)`.
pub fn group_code(entry: &Value) -> Option<i64> {
    entry.as_list().and_then(|items| items.first()).and_then(Value::as_int)
}

/// The datum of an association list entry: the dotted tail or the remaining elements.
pub fn group_value(entry: &Value) -> Option<Value> {
    let items = entry.as_list()?;
    match items {
        [_, dot, tail] if dot.is_symbol_named(".") => Some(tail.clone()),
        [_, rest @ ..] => Some(Value::list(rest.to_vec())),
        [] => None,
    }
}

#[derive(Debug, Default)]
struct Drawing {
    entities: BTreeMap<u64, Vec<Value>>,
    next_entity: u64,
    sets: HashMap<u64, Vec<u64>>,
    next_set: u64,
    sysvars: HashMap<String, SysVar>,
    commands: Vec<String>,
    messages: Vec<String>,
    replies: VecDeque<String>,
    keywords: Vec<String>,
    dialogs: Vec<String>,
    open_dialog: Option<String>,
    tiles: HashMap<String, String>,
    tile_modes: HashMap<String, i64>,
    actions: HashMap<String, String>,
    dialog_status: i64,
}

/// An in-memory drawing: entities are association lists keyed by handle.
///
/// Used by the REPL and by tests that exercise the host builtins.
#[derive(Debug, Default)]
pub struct MemoryHost {
    drawing: RefCell<Drawing>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command lines received so far.
    pub fn commands(&self) -> Vec<String> {
        self.drawing.borrow().commands.clone()
    }

    /// Alert and prompt messages received so far.
    pub fn messages(&self) -> Vec<String> {
        self.drawing.borrow().messages.clone()
    }

    pub fn entity_count(&self) -> usize {
        self.drawing.borrow().entities.len()
    }

    /// Queue a line of user input for the next `get*` or `entsel` call.
    /// An empty reply stands for pressing Enter.
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.drawing.borrow_mut().replies.push_back(reply.into());
    }

    /// The value and mode of a dialog tile, and the action attached to it.
    pub fn tile(&self, key: &str) -> (Option<String>, Option<i64>, Option<String>) {
        let drawing = self.drawing.borrow();
        (
            drawing.tiles.get(key).cloned(),
            drawing.tile_modes.get(key).copied(),
            drawing.actions.get(key).cloned(),
        )
    }

    /// Record the prompt and take the next non-empty reply.
    fn reply(&self, prompt: &str) -> Option<String> {
        let mut drawing = self.drawing.borrow_mut();
        if !prompt.is_empty() {
            drawing.messages.push(prompt.to_string());
        }
        drawing.replies.pop_front().filter(|r| !r.is_empty())
    }

    /// `x,y` or `x,y,z`; a bare number is a distance along the x axis.
    fn parse_point(text: &str) -> Option<Point> {
        let coords = text
            .split(',')
            .map(|c| c.trim().parse::<f64>().ok())
            .collect::<Option<Vec<_>>>()?;
        match coords.as_slice() {
            [x, y] => Some([*x, *y, 0.0]),
            [x, y, z] => Some([*x, *y, *z]),
            _ => None,
        }
    }

    fn distance(a: Point, b: Point) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(p, q)| (p - q).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Dialog handles count from 1.
    fn dialog_index(id: i64) -> Option<usize> {
        usize::try_from(id).ok()?.checked_sub(1)
    }

    fn dialog_open(&self) -> bool {
        self.drawing.borrow().open_dialog.is_some()
    }

    fn matches_filter(data: &[Value], filter: &[Value]) -> bool {
        filter.iter().all(|wanted| {
            let code = group_code(wanted);
            let value = group_value(wanted);
            data.iter().any(|have| {
                group_code(have) == code
                    && match (group_value(have), &value) {
                        (Some(Value::String(a)), Some(Value::String(b))) => {
                            a.eq_ignore_ascii_case(b)
                        }
                        (a, b) => a.as_ref() == b.as_ref(),
                    }
            })
        })
    }
}

impl HostBridge for MemoryHost {
    fn command(&self, tokens: &[String]) -> Result<(), LispError> {
        self.drawing.borrow_mut().commands.push(tokens.join(" "));
        Ok(())
    }

    fn entmake(&self, data: &[Value]) -> Option<u64> {
        let has_type = data
            .iter()
            .any(|e| group_code(e) == Some(0) && matches!(group_value(e), Some(Value::String(_))));
        if !has_type {
            return None;
        }
        let mut drawing = self.drawing.borrow_mut();
        drawing.next_entity += 1;
        let id = drawing.next_entity;
        let mut stored = Vec::with_capacity(data.len() + 1);
        stored.push(Value::dotted_pair(Value::Int(-1), Value::Ename(id)));
        stored.extend(data.iter().filter(|e| group_code(e) != Some(-1)).cloned());
        drawing.entities.insert(id, stored);
        Some(id)
    }

    fn entget(&self, ent: u64) -> Option<Vec<Value>> {
        self.drawing.borrow().entities.get(&ent).cloned()
    }

    fn entmod(&self, ent: u64, data: &[Value]) -> bool {
        let mut drawing = self.drawing.borrow_mut();
        match drawing.entities.get_mut(&ent) {
            Some(stored) => {
                for entry in data.iter().filter(|e| group_code(e) != Some(-1)) {
                    let code = group_code(entry);
                    let slot = stored.iter().position(|e| group_code(e) == code);
                    match slot {
                        Some(idx) => stored[idx] = entry.clone(),
                        None => stored.push(entry.clone()),
                    }
                }
                true
            }
            None => false,
        }
    }

    fn entdel(&self, ent: u64) -> bool {
        let mut drawing = self.drawing.borrow_mut();
        let removed = drawing.entities.remove(&ent).is_some();
        if removed {
            for members in drawing.sets.values_mut() {
                members.retain(|m| *m != ent);
            }
        }
        removed
    }

    fn entlast(&self) -> Option<u64> {
        self.drawing.borrow().entities.keys().next_back().copied()
    }

    fn entnext(&self, after: Option<u64>) -> Option<u64> {
        let drawing = self.drawing.borrow();
        match after {
            None => drawing.entities.keys().next().copied(),
            Some(id) => drawing
                .entities
                .range(id + 1..)
                .next()
                .map(|(k, _)| *k),
        }
    }

    fn getvar(&self, name: &str) -> Option<SysVar> {
        self.drawing
            .borrow()
            .sysvars
            .get(&name.to_ascii_uppercase())
            .cloned()
    }

    fn setvar(&self, name: &str, value: SysVar) -> Result<SysVar, LispError> {
        self.drawing
            .borrow_mut()
            .sysvars
            .insert(name.to_ascii_uppercase(), value.clone());
        Ok(value)
    }

    fn ssget(&self, mode: Option<&str>, filter: Option<&[Value]>) -> Option<u64> {
        if let Some(mode) = mode {
            if !mode.eq_ignore_ascii_case("X") && !mode.eq_ignore_ascii_case("A") {
                return None;
            }
        }
        let mut drawing = self.drawing.borrow_mut();
        let members: Vec<u64> = drawing
            .entities
            .iter()
            .filter(|(_, data)| filter.map_or(true, |f| Self::matches_filter(data, f)))
            .map(|(id, _)| *id)
            .collect();
        if members.is_empty() {
            return None;
        }
        drawing.next_set += 1;
        let set = drawing.next_set;
        drawing.sets.insert(set, members);
        Some(set)
    }

    fn ssadd(&self, ent: Option<u64>, set: Option<u64>) -> Option<u64> {
        let mut drawing = self.drawing.borrow_mut();
        if let Some(ent) = ent {
            if !drawing.entities.contains_key(&ent) {
                return None;
            }
        }
        let set = match set {
            Some(set) if drawing.sets.contains_key(&set) => set,
            Some(_) => return None,
            None => {
                drawing.next_set += 1;
                let set = drawing.next_set;
                drawing.sets.insert(set, Vec::new());
                set
            }
        };
        if let (Some(ent), Some(members)) = (ent, drawing.sets.get_mut(&set)) {
            if !members.contains(&ent) {
                members.push(ent);
            }
        }
        Some(set)
    }

    fn ssdel(&self, ent: u64, set: u64) -> bool {
        let mut drawing = self.drawing.borrow_mut();
        match drawing.sets.get_mut(&set) {
            Some(members) => {
                let before = members.len();
                members.retain(|m| *m != ent);
                members.len() != before
            }
            None => false,
        }
    }

    fn sslength(&self, set: u64) -> Option<usize> {
        self.drawing.borrow().sets.get(&set).map(Vec::len)
    }

    fn ssname(&self, set: u64, index: usize) -> Option<u64> {
        self.drawing
            .borrow()
            .sets
            .get(&set)
            .and_then(|members| members.get(index))
            .copied()
    }

    fn alert(&self, message: &str) {
        self.drawing.borrow_mut().messages.push(message.to_string());
    }

    fn initget(&self, _bits: i64, keywords: &str) {
        self.drawing.borrow_mut().keywords =
            keywords.split_whitespace().map(str::to_string).collect();
    }

    fn getint(&self, prompt: &str) -> Option<i64> {
        self.reply(prompt)?.trim().parse().ok()
    }

    fn getreal(&self, prompt: &str) -> Option<f64> {
        self.reply(prompt)?.trim().parse().ok()
    }

    fn getstring(&self, prompt: &str, allow_spaces: bool) -> Option<String> {
        let reply = self.reply(prompt)?;
        if allow_spaces {
            Some(reply)
        } else {
            reply.split(' ').next().map(str::to_string)
        }
    }

    fn getpoint(&self, prompt: &str, _base: Option<Point>) -> Option<Point> {
        Self::parse_point(&self.reply(prompt)?)
    }

    fn getcorner(&self, prompt: &str, _base: Point) -> Option<Point> {
        Self::parse_point(&self.reply(prompt)?)
    }

    /// A typed number, or the distance from `base` to a typed point.
    fn getdist(&self, prompt: &str, base: Option<Point>) -> Option<f64> {
        let reply = self.reply(prompt)?;
        if let Ok(d) = reply.trim().parse::<f64>() {
            return Some(d);
        }
        let to = Self::parse_point(&reply)?;
        Some(Self::distance(base.unwrap_or_default(), to))
    }

    /// A typed angle in degrees, or the direction from `base` to a typed point.
    fn getangle(&self, prompt: &str, base: Option<Point>) -> Option<f64> {
        let reply = self.reply(prompt)?;
        if let Ok(deg) = reply.trim().parse::<f64>() {
            return Some(deg.to_radians());
        }
        let to = Self::parse_point(&reply)?;
        let from = base.unwrap_or_default();
        let angle = (to[1] - from[1]).atan2(to[0] - from[0]);
        Some(angle.rem_euclid(std::f64::consts::TAU))
    }

    /// Matches a keyword case-insensitively, by its full name or a prefix.
    fn getkword(&self, prompt: &str) -> Option<String> {
        let reply = self.reply(prompt)?;
        let wanted = reply.trim();
        if wanted.is_empty() {
            return None;
        }
        let drawing = self.drawing.borrow();
        drawing
            .keywords
            .iter()
            .find(|k| k.eq_ignore_ascii_case(wanted))
            .or_else(|| {
                drawing.keywords.iter().find(|k| {
                    k.get(..wanted.len())
                        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(wanted))
                })
            })
            .cloned()
    }

    /// The reply names an entity handle, optionally followed by the pick point.
    fn entsel(&self, prompt: &str) -> Option<(u64, Point)> {
        let reply = self.reply(prompt)?;
        let (handle, point) = match reply.split_once(' ') {
            Some((h, p)) => (h, Self::parse_point(p)?),
            None => (reply.as_str(), [0.0; 3]),
        };
        let id: u64 = handle.trim().parse().ok()?;
        self.drawing
            .borrow()
            .entities
            .contains_key(&id)
            .then_some((id, point))
    }

    fn getfiled(&self, title: &str, _default: &str, _ext: &str, _flags: i64) -> Option<String> {
        self.reply(title)
    }

    fn load_dialog(&self, path: &str) -> Option<i64> {
        let mut drawing = self.drawing.borrow_mut();
        drawing.dialogs.push(path.to_string());
        i64::try_from(drawing.dialogs.len()).ok()
    }

    fn unload_dialog(&self, id: i64) {
        let Some(index) = Self::dialog_index(id) else {
            return;
        };
        if let Some(path) = self.drawing.borrow_mut().dialogs.get_mut(index) {
            path.clear();
        }
    }

    fn new_dialog(&self, name: &str, id: i64) -> bool {
        let mut drawing = self.drawing.borrow_mut();
        let loaded = Self::dialog_index(id)
            .and_then(|i| drawing.dialogs.get(i))
            .is_some_and(|path| !path.is_empty());
        if loaded {
            drawing.open_dialog = Some(name.to_string());
            drawing.dialog_status = 0;
        }
        loaded
    }

    fn set_tile(&self, key: &str, value: &str) -> bool {
        if !self.dialog_open() {
            return false;
        }
        self.drawing
            .borrow_mut()
            .tiles
            .insert(key.to_string(), value.to_string());
        true
    }

    fn get_tile(&self, key: &str) -> Option<String> {
        if !self.dialog_open() {
            return None;
        }
        self.drawing.borrow().tiles.get(key).cloned()
    }

    fn mode_tile(&self, key: &str, mode: i64) -> bool {
        if !self.dialog_open() || !(0..=4).contains(&mode) {
            return false;
        }
        self.drawing
            .borrow_mut()
            .tile_modes
            .insert(key.to_string(), mode);
        true
    }

    fn action_tile(&self, key: &str, action: &str) -> bool {
        if !self.dialog_open() {
            return false;
        }
        self.drawing
            .borrow_mut()
            .actions
            .insert(key.to_string(), action.to_string());
        true
    }

    /// Nobody is there to click, so the dialog closes at once with the
    /// status from the last `done_dialog`, 0 (cancel) by default.
    fn start_dialog(&self) -> Option<i64> {
        let mut drawing = self.drawing.borrow_mut();
        drawing.open_dialog.take()?;
        Some(drawing.dialog_status)
    }

    fn done_dialog(&self, status: Option<i64>) -> Option<(i64, i64)> {
        let mut drawing = self.drawing.borrow_mut();
        drawing.open_dialog.as_ref()?;
        drawing.dialog_status = status.unwrap_or(1);
        Some((0, 0))
    }

    fn term_dialog(&self) {
        self.drawing.borrow_mut().open_dialog = None;
    }

    fn prompt(&self, message: &str) {
        self.drawing.borrow_mut().messages.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(layer: &str) -> Vec<Value> {
        vec![
            Value::dotted_pair(Value::Int(0), Value::string("LINE")),
            Value::dotted_pair(Value::Int(8), Value::string(layer)),
            Value::list(vec![Value::Int(10), Value::Real(0.0), Value::Real(0.0)]),
        ]
    }

    #[test]
    fn group_code_and_value() {
        let pair = Value::dotted_pair(Value::Int(0), Value::string("LINE"));
        assert_eq!(group_code(&pair), Some(0));
        assert_eq!(group_value(&pair), Some(Value::string("LINE")));
        let point = Value::list(vec![Value::Int(10), Value::Real(1.0), Value::Real(2.0)]);
        assert_eq!(
            group_value(&point),
            Some(Value::list(vec![Value::Real(1.0), Value::Real(2.0)]))
        );
    }

    #[test]
    fn null_host_has_nothing() {
        let host = NullHost;
        assert!(host.entlast().is_none());
        assert!(host.getvar("CLAYER").is_none());
        assert!(host.command(&["LINE".into()]).is_err());
    }

    #[test]
    fn entmake_requires_entity_type() {
        let host = MemoryHost::new();
        assert!(host.entmake(&[]).is_none());
        let id = host.entmake(&line("0")).unwrap();
        let data = host.entget(id).unwrap();
        assert_eq!(data[0], Value::dotted_pair(Value::Int(-1), Value::Ename(id)));
        assert_eq!(host.entlast(), Some(id));
    }

    #[test]
    fn entnext_walks_in_creation_order() {
        let host = MemoryHost::new();
        let a = host.entmake(&line("0")).unwrap();
        let b = host.entmake(&line("0")).unwrap();
        assert_eq!(host.entnext(None), Some(a));
        assert_eq!(host.entnext(Some(a)), Some(b));
        assert_eq!(host.entnext(Some(b)), None);
    }

    #[test]
    fn entmod_replaces_group_codes() {
        let host = MemoryHost::new();
        let id = host.entmake(&line("0")).unwrap();
        assert!(host.entmod(
            id,
            &[Value::dotted_pair(Value::Int(8), Value::string("WALLS"))]
        ));
        let data = host.entget(id).unwrap();
        assert!(data.contains(&Value::dotted_pair(Value::Int(8), Value::string("WALLS"))));
        assert!(!host.entmod(999, &[]));
    }

    #[test]
    fn ssget_filters_by_group_codes() {
        let host = MemoryHost::new();
        host.entmake(&line("0")).unwrap();
        let walls = host.entmake(&line("WALLS")).unwrap();
        let filter = [Value::dotted_pair(Value::Int(8), Value::string("walls"))];
        let set = host.ssget(Some("X"), Some(&filter)).unwrap();
        assert_eq!(host.sslength(set), Some(1));
        assert_eq!(host.ssname(set, 0), Some(walls));
        assert_eq!(host.ssname(set, 1), None);
    }

    #[test]
    fn selection_set_editing() {
        let host = MemoryHost::new();
        let a = host.entmake(&line("0")).unwrap();
        let set = host.ssadd(None, None).unwrap();
        assert_eq!(host.sslength(set), Some(0));
        assert_eq!(host.ssadd(Some(a), Some(set)), Some(set));
        assert_eq!(host.sslength(set), Some(1));
        assert!(host.ssdel(a, set));
        assert!(!host.ssdel(a, set));
        assert!(host.entdel(a));
        assert!(host.entget(a).is_none());
    }

    #[test]
    fn null_host_input_and_dialogs_are_unavailable() {
        let host = NullHost;
        assert!(host.getint("Count: ").is_none());
        assert!(host.getorient("Angle: ", None).is_none());
        assert!(host.entsel("").is_none());
        assert!(host.load_dialog("dlg.dcl").is_none());
        assert!(!host.new_dialog("main", 1));
        assert!(host.start_dialog().is_none());
    }

    #[test]
    fn scripted_replies_feed_input() {
        let host = MemoryHost::new();
        for reply in ["12", "x", "3,4", "", "90", "3,4"] {
            host.push_reply(reply);
        }
        assert_eq!(host.getint("Count: "), Some(12));
        assert_eq!(host.getreal(""), None);
        assert_eq!(host.getpoint("", None), Some([3.0, 4.0, 0.0]));
        assert_eq!(host.getstring("", true), None);
        let right = host.getangle("", None).unwrap();
        assert!((right - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(host.getdist("", Some([0.0; 3])), Some(5.0));
        assert_eq!(host.getint(""), None);
        assert_eq!(host.messages(), vec!["Count: ".to_string()]);
    }

    #[test]
    fn keywords_match_by_prefix() {
        let host = MemoryHost::new();
        host.initget(0, "Yes No");
        host.push_reply("y");
        host.push_reply("NO");
        host.push_reply("maybe");
        assert_eq!(host.getkword(""), Some("Yes".to_string()));
        assert_eq!(host.getkword(""), Some("No".to_string()));
        assert_eq!(host.getkword(""), None);
    }

    #[test]
    fn entsel_needs_an_existing_entity() {
        let host = MemoryHost::new();
        let id = host.entmake(&line("0")).unwrap();
        host.push_reply(format!("{id} 1,2"));
        host.push_reply("999");
        assert_eq!(host.entsel(""), Some((id, [1.0, 2.0, 0.0])));
        assert_eq!(host.entsel(""), None);
    }

    #[test]
    fn dialog_session() {
        let host = MemoryHost::new();
        assert!(!host.set_tile("name", "x"));
        let id = host.load_dialog("settings.dcl").unwrap();
        assert!(!host.new_dialog("settings", id + 1));
        assert!(host.new_dialog("settings", id));
        assert!(host.set_tile("name", "WALLS"));
        assert_eq!(host.get_tile("name"), Some("WALLS".to_string()));
        assert!(host.mode_tile("name", 1));
        assert!(!host.mode_tile("name", 9));
        assert!(host.action_tile("accept", "(done_dialog 1)"));
        assert_eq!(host.done_dialog(Some(2)), Some((0, 0)));
        assert_eq!(host.start_dialog(), Some(2));
        assert_eq!(host.start_dialog(), None);
        assert_eq!(
            host.tile("name"),
            (Some("WALLS".to_string()), Some(1), None)
        );
        host.unload_dialog(id);
        assert!(!host.new_dialog("settings", id));
    }

    #[test]
    fn sysvars_are_case_insensitive() {
        let host = MemoryHost::new();
        host.setvar("clayer", SysVar::Str("WALLS".into())).unwrap();
        assert_eq!(host.getvar("CLAYER"), Some(SysVar::Str("WALLS".into())));
    }
}
