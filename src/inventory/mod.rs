//! Player inventory: named lists of item slots and their text record
//!
//! Item semantics (definitions, stacking rules, metadata) live elsewhere;
//! this module only stores stacks, compares inventories and reads/writes the
//! line-oriented inventory block embedded in player records:
//!
//! ```text
//! List main 32
//! Width 0
//! Item default:stone 99
//! Empty
//! ...
//! EndInventoryList
//! EndInventory
//! ```

use std::io::{self, BufRead, Write};

/// Slots in the player's main list (8 x 4)
pub const PLAYER_INVENTORY_SIZE: usize = 32;

/// Largest list a record may declare
pub const MAX_LIST_SIZE: usize = 4096;

const END_INVENTORY: &str = "EndInventory";
const END_LIST: &str = "EndInventoryList";

/// A stack of identical items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    pub name: String,
    pub count: u16,
    pub wear: u16,
}

impl ItemStack {
    pub fn new(name: impl Into<String>, count: u16) -> Self {
        Self {
            name: name.into(),
            count,
            wear: 0,
        }
    }

    pub fn with_wear(mut self, wear: u16) -> Self {
        self.wear = wear;
        self
    }

    /// Item names are written as a single whitespace-delimited word
    pub fn has_encodable_name(&self) -> bool {
        is_single_word(&self.name)
    }

    /// `name [count [wear]]`, omitting a count of 1 and a wear of 0
    pub fn item_string(&self) -> String {
        if self.wear != 0 {
            format!("{} {} {}", self.name, self.count, self.wear)
        } else if self.count != 1 {
            format!("{} {}", self.name, self.count)
        } else {
            self.name.clone()
        }
    }

    /// Parse an item string. A zero count yields an empty slot.
    pub fn parse_item_string(s: &str) -> Result<Option<Self>, String> {
        let mut parts = s.split_whitespace();
        let name = parts.next().ok_or_else(|| "missing item name".to_string())?;
        let count = match parts.next() {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| format!("bad item count {raw:?}: {e}"))?,
            None => 1,
        };
        let wear = match parts.next() {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| format!("bad item wear {raw:?}: {e}"))?,
            None => 0,
        };
        // Anything after wear is item metadata, which is not kept here

        if count == 0 {
            return Ok(None);
        }
        Ok(Some(Self {
            name: name.to_string(),
            count,
            wear,
        }))
    }
}

/// A named, fixed-size list of slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryList {
    name: String,
    width: u32,
    slots: Vec<Option<ItemStack>>,
}

impl InventoryList {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            width: 0,
            slots: vec![None; size],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width;
    }

    pub fn get(&self, index: usize) -> Option<&ItemStack> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Replace the stack in `index`, returning what was there.
    /// Out-of-range indices are ignored and a zero-count stack empties the
    /// slot.
    pub fn change_item(&mut self, index: usize, item: Option<ItemStack>) -> Option<ItemStack> {
        let item = item.filter(|stack| stack.count > 0);
        match self.slots.get_mut(index) {
            Some(slot) => std::mem::replace(slot, item),
            None => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn items(&self) -> impl Iterator<Item = Option<&ItemStack>> {
        self.slots.iter().map(Option::as_ref)
    }

    fn serialize<W: Write>(&self, sink: &mut W) -> Result<(), InventoryError> {
        writeln!(sink, "Width {}", self.width)?;
        for slot in &self.slots {
            match slot {
                Some(item) => {
                    if !item.has_encodable_name() {
                        return Err(InventoryError::UnencodableItem(item.name.clone()));
                    }
                    writeln!(sink, "Item {}", item.item_string())?;
                }
                None => writeln!(sink, "Empty")?,
            }
        }
        writeln!(sink, "{END_LIST}")?;
        Ok(())
    }

    fn deserialize<R: BufRead>(
        name: String,
        size: usize,
        source: &mut R,
    ) -> Result<Self, InventoryError> {
        let mut list = Self::new(name, size);
        let mut next_slot = 0;
        let mut buf = String::new();

        loop {
            let Some(line) = next_line(source, &mut buf)? else {
                return Err(InventoryError::Truncated { terminator: END_LIST });
            };
            let (keyword, rest) = split_keyword(line);

            match keyword {
                END_LIST | "end" => break,
                "" => continue,
                "Width" => {
                    list.width = rest.parse().map_err(|e| InventoryError::Parse {
                        line: line.to_string(),
                        reason: format!("bad width: {e}"),
                    })?;
                }
                "Item" | "Empty" => {
                    if next_slot >= size {
                        return Err(InventoryError::Parse {
                            line: line.to_string(),
                            reason: format!("list {:?} has more than {size} slots", list.name),
                        });
                    }
                    if keyword == "Item" {
                        list.slots[next_slot] = ItemStack::parse_item_string(rest).map_err(
                            |reason| InventoryError::Parse {
                                line: line.to_string(),
                                reason,
                            },
                        )?;
                    }
                    next_slot += 1;
                }
                _ => {
                    return Err(InventoryError::Parse {
                        line: line.to_string(),
                        reason: "unknown list entry".to_string(),
                    });
                }
            }
        }

        Ok(list)
    }
}

/// Ordered collection of inventory lists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    lists: Vec<InventoryList>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The layout every new player starts with
    pub fn new_player() -> Self {
        let mut inventory = Self::new();
        inventory.add_list("main", PLAYER_INVENTORY_SIZE);
        inventory.add_list("craft", 9).set_width(3);
        inventory.add_list("craftpreview", 1);
        inventory.add_list("craftresult", 1);
        inventory
    }

    pub fn clear(&mut self) {
        self.lists.clear();
    }

    /// Add a list, replacing any existing list with the same name
    pub fn add_list(&mut self, name: &str, size: usize) -> &mut InventoryList {
        let index = match self.lists.iter().position(|l| l.name == name) {
            Some(index) => {
                self.lists[index] = InventoryList::new(name, size);
                index
            }
            None => {
                self.lists.push(InventoryList::new(name, size));
                self.lists.len() - 1
            }
        };
        &mut self.lists[index]
    }

    pub fn list(&self, name: &str) -> Option<&InventoryList> {
        self.lists.iter().find(|l| l.name == name)
    }

    pub fn list_mut(&mut self, name: &str) -> Option<&mut InventoryList> {
        self.lists.iter_mut().find(|l| l.name == name)
    }

    pub fn lists(&self) -> &[InventoryList] {
        &self.lists
    }

    pub fn serialize<W: Write>(&self, sink: &mut W) -> Result<(), InventoryError> {
        for list in &self.lists {
            if !is_single_word(&list.name) {
                return Err(InventoryError::UnencodableList(list.name.clone()));
            }
            writeln!(sink, "List {} {}", list.name, list.size())?;
            list.serialize(sink)?;
        }
        writeln!(sink, "{END_INVENTORY}")?;
        Ok(())
    }

    /// Read an inventory block up to and including its `EndInventory` line.
    ///
    /// Returns a fresh inventory; nothing is modified on failure.
    pub fn deserialize<R: BufRead>(source: &mut R) -> Result<Self, InventoryError> {
        let mut inventory = Self::new();
        let mut buf = String::new();

        loop {
            let Some(line) = next_line(source, &mut buf)? else {
                return Err(InventoryError::Truncated {
                    terminator: END_INVENTORY,
                });
            };
            let (keyword, rest) = split_keyword(line);

            match keyword {
                END_INVENTORY | "end" => break,
                "" => continue,
                "List" => {
                    let mut parts = rest.split_whitespace();
                    let (Some(name), Some(size)) = (parts.next(), parts.next()) else {
                        return Err(InventoryError::Parse {
                            line: line.to_string(),
                            reason: "expected `List <name> <size>`".to_string(),
                        });
                    };
                    let size: usize = size.parse().map_err(|e| InventoryError::Parse {
                        line: line.to_string(),
                        reason: format!("bad list size: {e}"),
                    })?;
                    if size > MAX_LIST_SIZE {
                        return Err(InventoryError::Parse {
                            line: line.to_string(),
                            reason: format!("list size {size} exceeds {MAX_LIST_SIZE}"),
                        });
                    }
                    let name = name.to_string();

                    let list = InventoryList::deserialize(name, size, source)?;
                    match inventory.lists.iter().position(|l| l.name == list.name) {
                        Some(index) => inventory.lists[index] = list,
                        None => inventory.lists.push(list),
                    }
                }
                _ => {
                    return Err(InventoryError::Parse {
                        line: line.to_string(),
                        reason: "unknown inventory entry".to_string(),
                    });
                }
            }
        }

        Ok(inventory)
    }
}

/// Read the next line into `buf`, returning it trimmed, or `None` at end of
/// stream.
fn next_line<'a, R: BufRead>(source: &mut R, buf: &'a mut String) -> io::Result<Option<&'a str>> {
    buf.clear();
    if source.read_line(buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(buf.trim()))
}

/// Non-empty, no whitespace or control characters
fn is_single_word(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || c.is_control())
}

fn split_keyword(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    }
}

/// Inventory record errors
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Malformed inventory line {line:?}: {reason}")]
    Parse { line: String, reason: String },

    #[error("Inventory record ended before `{terminator}`")]
    Truncated { terminator: &'static str },

    #[error("Item name {0:?} cannot be written as a single word")]
    UnencodableItem(String),

    #[error("List name {0:?} cannot be written as a single word")]
    UnencodableList(String),

    #[error("Inventory I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn to_text(inventory: &Inventory) -> String {
        let mut out = Vec::new();
        inventory.serialize(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn player_layout() {
        let inventory = Inventory::new_player();
        let names: Vec<_> = inventory.lists().iter().map(|l| l.name()).collect();
        assert_eq!(names, ["main", "craft", "craftpreview", "craftresult"]);
        assert_eq!(inventory.list("main").unwrap().size(), PLAYER_INVENTORY_SIZE);
        assert_eq!(inventory.list("craft").unwrap().width(), 3);
    }

    #[test]
    fn item_string_omits_defaults() {
        assert_eq!(ItemStack::new("default:dirt", 1).item_string(), "default:dirt");
        assert_eq!(ItemStack::new("default:dirt", 5).item_string(), "default:dirt 5");
        assert_eq!(
            ItemStack::new("default:pick_stone", 1).with_wear(300).item_string(),
            "default:pick_stone 1 300"
        );
    }

    #[test]
    fn parse_item_string_fills_defaults() {
        assert_eq!(
            ItemStack::parse_item_string("default:dirt").unwrap(),
            Some(ItemStack::new("default:dirt", 1))
        );
        assert_eq!(ItemStack::parse_item_string("default:dirt 0").unwrap(), None);
        assert!(ItemStack::parse_item_string("default:dirt many").is_err());
        assert!(ItemStack::parse_item_string("").is_err());
    }

    #[test]
    fn writes_expected_text() {
        let mut inventory = Inventory::new();
        let list = inventory.add_list("main", 2);
        list.change_item(0, Some(ItemStack::new("default:stone", 99)));

        assert_eq!(
            to_text(&inventory),
            "List main 2\nWidth 0\nItem default:stone 99\nEmpty\nEndInventoryList\nEndInventory\n"
        );
    }

    #[test]
    fn reads_back_what_it_writes() {
        let mut inventory = Inventory::new_player();
        let main = inventory.list_mut("main").unwrap();
        main.change_item(3, Some(ItemStack::new("default:torch", 42)));
        main.change_item(31, Some(ItemStack::new("default:axe_steel", 1).with_wear(1200)));

        let text = to_text(&inventory);
        let decoded = Inventory::deserialize(&mut Cursor::new(text)).unwrap();
        assert_eq!(decoded, inventory);
    }

    #[test]
    fn stops_exactly_after_terminator() {
        let text = "List main 1\nEmpty\nEndInventoryList\nEndInventory\ntrailing\n";
        let mut cursor = Cursor::new(text);
        Inventory::deserialize(&mut cursor).unwrap();

        let mut rest = String::new();
        cursor.read_line(&mut rest).unwrap();
        assert_eq!(rest, "trailing\n");
    }

    #[test]
    fn short_list_leaves_remaining_slots_empty() {
        let text = "List main 4\nItem a:b\nEndInventoryList\nEndInventory\n";
        let inventory = Inventory::deserialize(&mut Cursor::new(text)).unwrap();
        let main = inventory.list("main").unwrap();
        assert_eq!(main.size(), 4);
        assert_eq!(main.get(0), Some(&ItemStack::new("a:b", 1)));
        assert!(main.get(1).is_none());
    }

    #[test]
    fn overfull_list_is_rejected() {
        let text = "List main 1\nEmpty\nEmpty\nEndInventoryList\nEndInventory\n";
        assert!(matches!(
            Inventory::deserialize(&mut Cursor::new(text)),
            Err(InventoryError::Parse { .. })
        ));
    }

    #[test]
    fn missing_terminators_are_truncation() {
        let no_list_end = "List main 1\nEmpty\n";
        assert!(matches!(
            Inventory::deserialize(&mut Cursor::new(no_list_end)),
            Err(InventoryError::Truncated { terminator: END_LIST })
        ));

        let no_end = "List main 1\nEmpty\nEndInventoryList\n";
        assert!(matches!(
            Inventory::deserialize(&mut Cursor::new(no_end)),
            Err(InventoryError::Truncated { terminator: END_INVENTORY })
        ));
    }

    #[test]
    fn refuses_item_names_that_would_break_framing() {
        let mut inventory = Inventory::new();
        inventory
            .add_list("main", 1)
            .change_item(0, Some(ItemStack::new("evil\nEndInventory", 1)));

        let mut out = Vec::new();
        assert!(matches!(
            inventory.serialize(&mut out),
            Err(InventoryError::UnencodableItem(_))
        ));
    }

    #[test]
    fn equality_sees_slot_changes() {
        let a = Inventory::new_player();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.list_mut("craft")
            .unwrap()
            .change_item(4, Some(ItemStack::new("default:wood", 1)));
        assert_ne!(a, b);
    }

    #[test]
    fn oversized_list_is_refused_before_allocating() {
        for size in ["18446744073709551615", "10000000000", "4097"] {
            let text = format!("List main {size}\nEndInventoryList\nEndInventory\n");
            let err = Inventory::deserialize(&mut Cursor::new(text)).unwrap_err();
            assert!(matches!(err, InventoryError::Parse { .. }), "{size}: {err}");
        }
    }

    #[test]
    fn zero_count_stack_empties_the_slot() {
        let mut inventory = Inventory::new_player();
        let main = inventory.list_mut("main").unwrap();
        main.change_item(0, Some(ItemStack::new("default:dirt", 5)));
        main.change_item(0, Some(ItemStack::new("default:dirt", 0)));
        assert_eq!(main.get(0), None);

        let decoded = Inventory::deserialize(&mut Cursor::new(to_text(&inventory))).unwrap();
        assert_eq!(decoded, inventory);
    }

    #[test]
    fn list_names_must_be_one_word() {
        let mut inventory = Inventory::new();
        inventory.add_list("two words", 1);
        let mut out = Vec::new();
        assert!(matches!(
            inventory.serialize(&mut out),
            Err(InventoryError::UnencodableList(_))
        ));
        assert!(out.is_empty());
    }
}
