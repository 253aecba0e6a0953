//! Persistent singly-linked list used for both code and data.
//!
//! A [`List`] is a header holding a shared pointer to its first node and a cached length.
//! Nodes are immutable once built, so any number of lists may share a common suffix:
//! [`List::cons`] and [`List::tail`] are O(1) and never copy, while [`List::append`] copies
//! only its left operand.

use crate::ast::Value;
use std::fmt;
use std::rc::Rc;

struct Node {
    value: Value,
    next: Option<Rc<Node>>,
}

/// An immutable list with O(1) `cons`, `head`, `tail` and `len`.
#[derive(Clone, Default)]
pub struct List {
    head: Option<Rc<Node>>,
    len: usize,
}

impl List {
    /// The empty list.
    pub fn new() -> Self {
        List { head: None, len: 0 }
    }

    /// A new list with `value` prepended to `list`. `list` itself is untouched.
    pub fn cons(value: Value, list: &List) -> List {
        List {
            head: Some(Rc::new(Node {
                value,
                next: list.head.clone(),
            })),
            len: list.len + 1,
        }
    }

    /// The first element, or `None` for the empty list.
    pub fn head(&self) -> Option<&Value> {
        self.head.as_ref().map(|node| &node.value)
    }

    /// Everything but the first element. The tail of the empty list is the empty list.
    pub fn tail(&self) -> List {
        match &self.head {
            Some(node) => List {
                head: node.next.clone(),
                len: self.len - 1,
            },
            None => List::new(),
        }
    }

    /// Splits off the first element.
    pub fn uncons(&self) -> Option<(&Value, List)> {
        self.head().map(|head| (head, self.tail()))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A list holding the elements of `front` followed by those of `back`.
    ///
    /// The nodes of `front` are copied, the result shares `back`.
    pub fn append(front: &List, back: &List) -> List {
        let mut elements: Vec<&Value> = front.iter().collect();
        let mut result = back.clone();
        while let Some(value) = elements.pop() {
            result = List::cons(value.clone(), &result);
        }
        result
    }

    /// Element at `index`, walking the chain.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.iter().nth(index)
    }

    /// The last element, if any.
    pub fn last(&self) -> Option<&Value> {
        self.iter().last()
    }

    /// A new list with the elements in reverse order.
    pub fn reversed(&self) -> List {
        self.iter()
            .fold(List::new(), |acc, value| List::cons(value.clone(), &acc))
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head.as_deref(),
            remaining: self.len,
        }
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.iter().cloned().collect()
    }
}

impl Drop for List {
    fn drop(&mut self) {
        // Unlink uniquely owned nodes one at a time so long lists don't recurse.
        let mut next = self.head.take();
        while let Some(node) = next {
            match Rc::try_unwrap(node) {
                Ok(mut node) => next = node.next.take(),
                Err(_) => break,
            }
        }
    }
}

/// Borrowing iterator over a [`List`].
pub struct Iter<'a> {
    next: Option<&'a Node>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next.as_deref();
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Value;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut elements: Vec<Value> = iter.into_iter().collect();
        let mut list = List::new();
        while let Some(value) = elements.pop() {
            list = List::cons(value, &list);
        }
        list
    }
}

impl From<Vec<Value>> for List {
    fn from(values: Vec<Value>) -> Self {
        values.into_iter().collect()
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        let mut a = self.head.as_ref();
        let mut b = other.head.as_ref();
        while let (Some(x), Some(y)) = (a, b) {
            // Shared suffixes are equal without walking them
            if Rc::ptr_eq(x, y) {
                return true;
            }
            if x.value != y.value {
                return false;
            }
            a = x.next.as_ref();
            b = y.next.as_ref();
        }
        true
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Build a [`List`] from a comma-separated sequence of expressions convertible to [`Value`].
#[macro_export]
macro_rules! list {
    () => { $crate::list::List::new() };
    ($($value:expr),+ $(,)?) => {
        $crate::list::List::from(vec![$($crate::ast::Value::from($value)),+])
    };
}
