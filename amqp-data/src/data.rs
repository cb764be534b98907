//! A tree of AMQP values with an explicit navigation cursor.

use crate::{
    decode, encode,
    error::Error,
    primitives::{Binary, Symbol, Timestamp, Uuid},
    value::{Array, Described, Type, Value},
};

/// An owned tree of AMQP values rooted at an implicit top-level sequence,
/// together with one navigable cursor.
///
/// The cursor denotes a position in the tree: a stack of entered composite
/// nodes plus an offset among the children of the innermost one. `put_*`
/// operations insert at the cursor and leave the cursor on the new node,
/// `get_*` operations read the node under the cursor, and [`enter`] /
/// [`exit`] descend into and climb out of composite nodes.
///
/// A map node reports 2N children, alternating key, value, key, value. A
/// described node reports two children: the descriptor and the body.
///
/// Encoding and decoding leave the cursor rewound.
///
/// [`enter`]: Data::enter
/// [`exit`]: Data::exit
#[derive(Debug, Clone, Default)]
pub struct Data {
    root: Vec<Value>,
    frames: Vec<Frame>,
    pos: Option<usize>,
}

#[derive(Debug, Clone)]
struct Frame {
    /// Flat child index of the entered composite within its parent level.
    child: usize,
    /// Key put into a map that is still waiting for its value.
    pending_key: Option<Value>,
}

fn child(parent: &Value, index: usize) -> Option<&Value> {
    match parent {
        Value::List(items) => items.get(index),
        Value::Array(array) => array.elements().get(index),
        Value::Map(map) => map
            .get_index(index / 2)
            .map(|(k, v)| if index % 2 == 0 { k } else { v }),
        Value::Described(described) => match index {
            0 => Some(&described.descriptor),
            1 => Some(&described.value),
            _ => None,
        },
        _ => None,
    }
}

fn child_mut(parent: &mut Value, index: usize) -> Option<&mut Value> {
    match parent {
        Value::List(items) => items.get_mut(index),
        Value::Array(array) => array.elements_mut().get_mut(index),
        // Map keys are hashed and are never handed out mutably.
        Value::Map(map) => match index % 2 {
            0 => None,
            _ => map.get_index_mut(index / 2).map(|(_, v)| v),
        },
        Value::Described(described) => match index {
            0 => Some(&mut described.descriptor),
            1 => Some(&mut described.value),
            _ => None,
        },
        _ => None,
    }
}

/// Number of children a composite node exposes to the cursor.
fn base_children(parent: &Value) -> usize {
    match parent {
        Value::List(items) => items.len(),
        Value::Array(array) => array.len(),
        Value::Map(map) => 2 * map.len(),
        Value::Described(_) => 2,
        _ => 0,
    }
}

impl Data {
    /// Creates an empty tree with the cursor at the start
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of values in the top-level sequence
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Whether the tree holds no values at all
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// The values of the top-level sequence
    pub fn values(&self) -> &[Value] {
        &self.root
    }

    /// Consumes the tree into its top-level values
    pub fn into_values(self) -> Vec<Value> {
        self.root
    }

    /// Drops every value and rewinds the cursor
    pub fn clear(&mut self) {
        self.root.clear();
        self.rewind();
    }

    /// Moves the cursor back to before the first top-level value
    pub fn rewind(&mut self) {
        self.frames.clear();
        self.pos = None;
    }

    // -- cursor resolution ---------------------------------------------------

    /// The innermost entered composite, if any frames are on the stack.
    fn container(&self) -> Option<&Value> {
        let mut frames = self.frames.iter();
        let first = frames.next()?;
        let mut node = self.root.get(first.child)?;
        for frame in frames {
            node = child(node, frame.child)?;
        }
        Some(node)
    }

    fn container_mut(&mut self) -> Option<&mut Value> {
        let mut frames = self.frames.iter();
        let first = frames.next()?;
        let mut node = self.root.get_mut(first.child)?;
        for frame in frames {
            node = child_mut(node, frame.child)?;
        }
        Some(node)
    }

    /// Number of children at the current cursor level, including a map key
    /// that has been put but not yet paired with its value.
    fn level_len(&self) -> usize {
        let pending = self
            .frames
            .last()
            .map_or(0, |f| usize::from(f.pending_key.is_some()));
        let base = match self.container() {
            Some(parent) => base_children(parent),
            None => {
                if self.frames.is_empty() {
                    self.root.len()
                } else {
                    return pending;
                }
            }
        };
        base + pending
    }

    /// Whether the cursor sits on a map key that is not yet paired.
    fn at_pending_key(&self) -> bool {
        match (self.pos, self.frames.last()) {
            (Some(pos), Some(frame)) if frame.pending_key.is_some() => {
                let base = self.container().map_or(0, base_children);
                pos == base
            }
            _ => false,
        }
    }

    /// The node under the cursor, or `None` when the cursor is not on one.
    fn node(&self) -> Option<&Value> {
        let pos = self.pos?;
        if self.frames.is_empty() {
            return self.root.get(pos);
        }
        if self.at_pending_key() {
            return self.frames.last()?.pending_key.as_ref();
        }
        let parent = self.container()?;
        child(parent, pos)
    }

    // -- navigation ----------------------------------------------------------

    /// Advances the cursor to the next sibling. Returns `false` and leaves
    /// the cursor in place when there is none.
    pub fn next(&mut self) -> bool {
        let next = self.pos.map_or(0, |pos| pos + 1);
        if next < self.level_len() {
            self.pos = Some(next);
            true
        } else {
            false
        }
    }

    /// The type tag of the node under the cursor, [`Type::Invalid`] when the
    /// cursor is not positioned on a node.
    pub fn node_type(&self) -> Type {
        self.node().map_or(Type::Invalid, Value::amqp_type)
    }

    /// Number of children of the node under the cursor. A map reports twice
    /// its number of entries, matching the wire count.
    pub fn count(&self) -> usize {
        self.node().map_or(0, base_children)
    }

    /// Descends into the composite node under the cursor, leaving the cursor
    /// before its first child. Returns `false` when the cursor is not on a
    /// list, map, array or described node.
    pub fn enter(&mut self) -> bool {
        let Some(pos) = self.pos else { return false };
        // a key that is not in its map yet has no addressable children
        if self.at_pending_key() {
            return false;
        }
        match self.node() {
            Some(Value::List(_) | Value::Map(_) | Value::Array(_) | Value::Described(_)) => {
                self.frames.push(Frame {
                    child: pos,
                    pending_key: None,
                });
                self.pos = None;
                true
            }
            _ => false,
        }
    }

    /// Climbs out of the current composite, leaving the cursor on it. A map
    /// key that was never paired with a value is dropped, since the map
    /// cannot represent it.
    pub fn exit(&mut self) -> bool {
        match self.frames.pop() {
            Some(frame) => {
                self.pos = Some(frame.child);
                true
            }
            None => false,
        }
    }

    // -- producers -----------------------------------------------------------

    /// Inserts a value at the cursor and leaves the cursor on it.
    ///
    /// Inside a map, values alternate between key and value roles; inside an
    /// array, the value must carry the array's declared element type.
    pub fn put_value(&mut self, value: impl Into<Value>) -> Result<(), Error> {
        let value = value.into();
        if self.frames.is_empty() {
            let index = self.pos.map_or(0, |pos| pos + 1);
            self.root.insert(index, value);
            self.pos = Some(index);
            return Ok(());
        }

        enum Kind {
            List,
            Array(Type),
            Map,
            Described,
        }
        let kind = match self.container() {
            Some(Value::List(_)) => Kind::List,
            Some(Value::Array(array)) => Kind::Array(array.element_type()),
            Some(Value::Map(_)) => Kind::Map,
            Some(Value::Described(_)) => Kind::Described,
            _ => return Err(Error::InvalidCursor),
        };

        match kind {
            Kind::List => {
                let index = self.pos.map_or(0, |pos| pos + 1);
                match self.container_mut() {
                    Some(Value::List(items)) => items.insert(index, value),
                    _ => return Err(Error::InvalidCursor),
                }
                self.pos = Some(index);
            }
            Kind::Array(element) => {
                let found = value.amqp_type();
                if found != element {
                    return Err(Error::MismatchedArrayElement {
                        expecting: element,
                        found,
                    });
                }
                let index = self.pos.map_or(0, |pos| pos + 1);
                match self.container_mut() {
                    Some(Value::Array(array)) => array.elements_mut().insert(index, value),
                    _ => return Err(Error::InvalidCursor),
                }
                self.pos = Some(index);
            }
            Kind::Map => {
                let pending = self
                    .frames
                    .last_mut()
                    .and_then(|frame| frame.pending_key.take());
                match pending {
                    Some(key) => {
                        let len = match self.container_mut() {
                            Some(Value::Map(map)) => {
                                map.insert(key, value);
                                map.len()
                            }
                            _ => return Err(Error::InvalidCursor),
                        };
                        self.pos = Some(2 * len - 1);
                    }
                    None => {
                        let len = match self.container() {
                            Some(Value::Map(map)) => map.len(),
                            _ => return Err(Error::InvalidCursor),
                        };
                        if let Some(frame) = self.frames.last_mut() {
                            frame.pending_key = Some(value);
                        }
                        self.pos = Some(2 * len);
                    }
                }
            }
            Kind::Described => {
                // the two slots are assigned in order: descriptor, then body
                let index = self.pos.map_or(0, |pos| pos + 1);
                match (index, self.container_mut()) {
                    (0, Some(Value::Described(described))) => described.descriptor = value,
                    (1, Some(Value::Described(described))) => described.value = value,
                    _ => return Err(Error::InvalidCursor),
                }
                self.pos = Some(index);
            }
        }
        Ok(())
    }

    /// Inserts a null value
    pub fn put_null(&mut self) -> Result<(), Error> {
        self.put_value(Value::Null)
    }

    /// Inserts a boolean value
    pub fn put_bool(&mut self, value: bool) -> Result<(), Error> {
        self.put_value(Value::Bool(value))
    }

    /// Inserts an 8-bit unsigned integer
    pub fn put_ubyte(&mut self, value: u8) -> Result<(), Error> {
        self.put_value(Value::UByte(value))
    }

    /// Inserts a 16-bit unsigned integer
    pub fn put_ushort(&mut self, value: u16) -> Result<(), Error> {
        self.put_value(Value::UShort(value))
    }

    /// Inserts a 32-bit unsigned integer
    pub fn put_uint(&mut self, value: u32) -> Result<(), Error> {
        self.put_value(Value::UInt(value))
    }

    /// Inserts a 64-bit unsigned integer
    pub fn put_ulong(&mut self, value: u64) -> Result<(), Error> {
        self.put_value(Value::ULong(value))
    }

    /// Inserts an 8-bit signed integer
    pub fn put_byte(&mut self, value: i8) -> Result<(), Error> {
        self.put_value(Value::Byte(value))
    }

    /// Inserts a 16-bit signed integer
    pub fn put_short(&mut self, value: i16) -> Result<(), Error> {
        self.put_value(Value::Short(value))
    }

    /// Inserts a 32-bit signed integer
    pub fn put_int(&mut self, value: i32) -> Result<(), Error> {
        self.put_value(Value::Int(value))
    }

    /// Inserts a 64-bit signed integer
    pub fn put_long(&mut self, value: i64) -> Result<(), Error> {
        self.put_value(Value::Long(value))
    }

    /// Inserts a 32-bit floating point number
    pub fn put_float(&mut self, value: f32) -> Result<(), Error> {
        self.put_value(Value::Float(value.into()))
    }

    /// Inserts a 64-bit floating point number
    pub fn put_double(&mut self, value: f64) -> Result<(), Error> {
        self.put_value(Value::Double(value.into()))
    }

    /// Inserts a single Unicode character
    pub fn put_char(&mut self, value: char) -> Result<(), Error> {
        self.put_value(Value::Char(value))
    }

    /// Inserts a timestamp
    pub fn put_timestamp(&mut self, value: impl Into<Timestamp>) -> Result<(), Error> {
        self.put_value(Value::Timestamp(value.into()))
    }

    /// Inserts a uuid
    pub fn put_uuid(&mut self, value: impl Into<Uuid>) -> Result<(), Error> {
        self.put_value(Value::Uuid(value.into()))
    }

    /// Inserts a binary value
    pub fn put_binary(&mut self, value: impl Into<Binary>) -> Result<(), Error> {
        self.put_value(Value::Binary(value.into()))
    }

    /// Inserts a string value
    pub fn put_string(&mut self, value: impl Into<String>) -> Result<(), Error> {
        self.put_value(Value::String(value.into()))
    }

    /// Inserts a symbol value
    pub fn put_symbol(&mut self, value: impl Into<Symbol>) -> Result<(), Error> {
        self.put_value(Value::Symbol(value.into()))
    }

    /// Inserts an empty list and leaves the cursor on it; [`enter`] then
    /// descends to before its first child.
    ///
    /// [`enter`]: Data::enter
    pub fn put_list(&mut self) -> Result<(), Error> {
        self.put_value(Value::List(Vec::new()))
    }

    /// Inserts an empty map and leaves the cursor on it. Children put after
    /// entering the map alternate between key and value roles.
    pub fn put_map(&mut self) -> Result<(), Error> {
        self.put_value(Value::Map(Default::default()))
    }

    /// Inserts an empty array with the declared element type. Described
    /// element constructors are not supported.
    pub fn put_array(&mut self, element: Type) -> Result<(), Error> {
        match element {
            Type::Described => Err(Error::Unsupported("described array elements")),
            Type::Invalid => Err(Error::InvalidValue),
            element => self.put_value(Value::Array(Array::new(element))),
        }
    }

    /// Inserts an empty described value. Children put after entering it fill
    /// the descriptor slot first, then the body slot.
    pub fn put_described(&mut self) -> Result<(), Error> {
        self.put_value(Value::Described(Box::new(Described {
            descriptor: Value::Null,
            value: Value::Null,
        })))
    }

    // -- consumers -----------------------------------------------------------

    fn found(&self) -> Type {
        self.node_type()
    }

    /// Clones the whole value under the cursor
    pub fn get_value(&self) -> Result<Value, Error> {
        self.node()
            .cloned()
            .ok_or(Error::mismatch(Type::Invalid, "Value"))
    }

    /// A borrowed view of the value under the cursor
    pub fn value_ref(&self) -> Option<&Value> {
        self.node()
    }

    /// Reads a boolean value
    pub fn get_bool(&self) -> Result<bool, Error> {
        match self.node() {
            Some(Value::Bool(v)) => Ok(*v),
            _ => Err(Error::mismatch(self.found(), "bool")),
        }
    }

    /// Reads an 8-bit unsigned integer
    pub fn get_ubyte(&self) -> Result<u8, Error> {
        match self.node() {
            Some(Value::UByte(v)) => Ok(*v),
            _ => Err(Error::mismatch(self.found(), "u8")),
        }
    }

    /// Reads a 16-bit unsigned integer
    pub fn get_ushort(&self) -> Result<u16, Error> {
        match self.node() {
            Some(Value::UShort(v)) => Ok(*v),
            _ => Err(Error::mismatch(self.found(), "u16")),
        }
    }

    /// Reads a 32-bit unsigned integer
    pub fn get_uint(&self) -> Result<u32, Error> {
        match self.node() {
            Some(Value::UInt(v)) => Ok(*v),
            _ => Err(Error::mismatch(self.found(), "u32")),
        }
    }

    /// Reads a 64-bit unsigned integer
    pub fn get_ulong(&self) -> Result<u64, Error> {
        match self.node() {
            Some(Value::ULong(v)) => Ok(*v),
            _ => Err(Error::mismatch(self.found(), "u64")),
        }
    }

    /// Reads an 8-bit signed integer
    pub fn get_byte(&self) -> Result<i8, Error> {
        match self.node() {
            Some(Value::Byte(v)) => Ok(*v),
            _ => Err(Error::mismatch(self.found(), "i8")),
        }
    }

    /// Reads a 16-bit signed integer
    pub fn get_short(&self) -> Result<i16, Error> {
        match self.node() {
            Some(Value::Short(v)) => Ok(*v),
            _ => Err(Error::mismatch(self.found(), "i16")),
        }
    }

    /// Reads a 32-bit signed integer
    pub fn get_int(&self) -> Result<i32, Error> {
        match self.node() {
            Some(Value::Int(v)) => Ok(*v),
            _ => Err(Error::mismatch(self.found(), "i32")),
        }
    }

    /// Reads a 64-bit signed integer
    pub fn get_long(&self) -> Result<i64, Error> {
        match self.node() {
            Some(Value::Long(v)) => Ok(*v),
            _ => Err(Error::mismatch(self.found(), "i64")),
        }
    }

    /// Reads a 32-bit floating point number
    pub fn get_float(&self) -> Result<f32, Error> {
        match self.node() {
            Some(Value::Float(v)) => Ok(v.0),
            _ => Err(Error::mismatch(self.found(), "f32")),
        }
    }

    /// Reads a 64-bit floating point number
    pub fn get_double(&self) -> Result<f64, Error> {
        match self.node() {
            Some(Value::Double(v)) => Ok(v.0),
            _ => Err(Error::mismatch(self.found(), "f64")),
        }
    }

    /// Reads a single Unicode character
    pub fn get_char(&self) -> Result<char, Error> {
        match self.node() {
            Some(Value::Char(v)) => Ok(*v),
            _ => Err(Error::mismatch(self.found(), "char")),
        }
    }

    /// Reads a timestamp
    pub fn get_timestamp(&self) -> Result<Timestamp, Error> {
        match self.node() {
            Some(Value::Timestamp(v)) => Ok(*v),
            _ => Err(Error::mismatch(self.found(), "Timestamp")),
        }
    }

    /// Reads a uuid
    pub fn get_uuid(&self) -> Result<Uuid, Error> {
        match self.node() {
            Some(Value::Uuid(v)) => Ok(*v),
            _ => Err(Error::mismatch(self.found(), "Uuid")),
        }
    }

    /// A borrowed view of the binary payload under the cursor. The view is
    /// valid until the next mutation of the tree.
    pub fn get_binary(&self) -> Result<&[u8], Error> {
        match self.node() {
            Some(Value::Binary(v)) => Ok(v.as_slice()),
            _ => Err(Error::mismatch(self.found(), "Binary")),
        }
    }

    /// A borrowed view of the string under the cursor
    pub fn get_string(&self) -> Result<&str, Error> {
        match self.node() {
            Some(Value::String(v)) => Ok(v),
            _ => Err(Error::mismatch(self.found(), "String")),
        }
    }

    /// A borrowed view of the symbol under the cursor
    pub fn get_symbol(&self) -> Result<&str, Error> {
        match self.node() {
            Some(Value::Symbol(v)) => Ok(v.as_str()),
            _ => Err(Error::mismatch(self.found(), "Symbol")),
        }
    }

    /// Number of children of the list under the cursor
    pub fn get_list(&self) -> Result<usize, Error> {
        match self.node() {
            Some(Value::List(items)) => Ok(items.len()),
            _ => Err(Error::mismatch(self.found(), "List")),
        }
    }

    /// Child count of the map under the cursor: twice the number of entries,
    /// matching the wire format that encodes 2N items.
    pub fn get_map(&self) -> Result<usize, Error> {
        match self.node() {
            Some(Value::Map(map)) => Ok(2 * map.len()),
            _ => Err(Error::mismatch(self.found(), "Map")),
        }
    }

    /// Number of elements of the array under the cursor
    pub fn get_array(&self) -> Result<usize, Error> {
        match self.node() {
            Some(Value::Array(array)) => Ok(array.len()),
            _ => Err(Error::mismatch(self.found(), "Array")),
        }
    }

    /// The declared element type of the array under the cursor
    pub fn array_element_type(&self) -> Result<Type, Error> {
        match self.node() {
            Some(Value::Array(array)) => Ok(array.element_type()),
            _ => Err(Error::mismatch(self.found(), "Array")),
        }
    }

    /// A borrowed view of the described value under the cursor
    pub fn get_described(&self) -> Result<&Described, Error> {
        match self.node() {
            Some(Value::Described(described)) => Ok(described),
            _ => Err(Error::mismatch(self.found(), "Described")),
        }
    }

    // -- whole-tree operations -----------------------------------------------

    /// Duplicates the top-level values of `other` into this tree at the
    /// cursor, with value semantics.
    pub fn copy_from(&mut self, other: &Data) -> Result<(), Error> {
        for value in &other.root {
            self.put_value(value.clone())?;
        }
        Ok(())
    }

    /// Serialized size of the whole tree in bytes. Also validates the tree,
    /// so an unencodable value is reported here rather than halfway through
    /// a write.
    pub fn encoded_size(&self) -> Result<usize, Error> {
        self.root.iter().try_fold(0usize, |acc, value| {
            Ok(acc + encode::encoded_size(value)?)
        })
    }

    /// Encodes the whole tree into `buf` using minimal encodings and rewinds
    /// the cursor.
    ///
    /// Returns the number of bytes written. When `buf` is too small the call
    /// fails with [`Error::Overflow`] before anything is written; the caller
    /// is expected to retry with a larger buffer.
    pub fn encode(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let size = self.encoded_size()?;
        if size > buf.len() {
            return Err(Error::Overflow);
        }
        let mut written = 0;
        for value in &self.root {
            written += encode::encode_value(value, &mut buf[written..])?;
        }
        debug_assert_eq!(written, size);
        self.rewind();
        Ok(written)
    }

    /// Encodes the whole tree into a freshly sized vector
    pub fn encode_to_vec(&mut self) -> Result<Vec<u8>, Error> {
        let size = self.encoded_size()?;
        let mut buf = vec![0u8; size];
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decodes one complete top-level value from the front of `bytes`,
    /// appends it to the tree and rewinds the cursor.
    ///
    /// Returns the number of bytes consumed. When `bytes` is a strict prefix
    /// of an encoding the call fails with [`Error::Underflow`], consumes
    /// nothing and leaves the tree untouched.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        let (value, consumed) = decode::decode_value(bytes)?;
        self.rewind();
        self.root.push(value);
        Ok(consumed)
    }
}

impl From<Value> for Data {
    fn from(value: Value) -> Self {
        Self {
            root: vec![value],
            frames: Vec::new(),
            pos: None,
        }
    }
}

impl FromIterator<Value> for Data {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self {
            root: iter.into_iter().collect(),
            frames: Vec::new(),
            pos: None,
        }
    }
}
