//! Arena Handles
//!
//! Every entity of a module lives in a flat array owned by the module and is
//! referred to by one of these typed indices.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! arena_id {
    ($(#[$attr:meta])* $name:ident, $prefix:literal) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(index: usize) -> Self {
                Self(index as u32)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Handle into the type store
    TypeId, "t"
);
arena_id!(
    /// Handle of an SSA definition: constant, reference, parameter or instruction result
    ValueId, "%"
);
arena_id!(
    /// Handle into the instruction array
    InstrId, "i"
);
arena_id!(
    /// Handle of a basic block
    BlockId, "bb"
);
arena_id!(
    /// Handle of a function
    FuncId, "fn"
);
arena_id!(
    /// Handle of a global variable
    GlobalId, "g"
);
