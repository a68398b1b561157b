//! Human-readable rendering of a sheet

use super::Sheet;
use crate::cell::{CellBody, CellKind};
use crate::relation::DisplayRelation;
use std::fmt;

const DUMP_ORDER: [CellKind; 7] = [
    CellKind::Constant,
    CellKind::Input,
    CellKind::InterfaceInput,
    CellKind::InterfaceOutput,
    CellKind::Logic,
    CellKind::Output,
    CellKind::Invariant,
];

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for kind in DUMP_ORDER {
            for cell in self.cells.iter().filter(|cell| cell.kind == kind) {
                write!(f, "{} {}", kind, cell.name)?;
                match &cell.body {
                    CellBody::Derived(derived) => {
                        write!(f, " <== {} = {}", derived.expr, cell.value)?
                    }
                    CellBody::Input(input) => {
                        write!(f, " = {} [priority {}", cell.value, input.priority)?;
                        if input.linked {
                            f.write_str(", linked")?;
                        }
                        f.write_str("]")?;
                    }
                    CellBody::Constant { initializer } => {
                        write!(f, " <== {} = {}", initializer, cell.value)?
                    }
                }
                writeln!(f)?;
            }
        }
        for relation in &self.relations {
            writeln!(
                f,
                "{}",
                DisplayRelation {
                    relation,
                    cells: &self.cells,
                }
            )?;
        }
        Ok(())
    }
}
