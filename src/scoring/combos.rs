use std::collections::HashSet;

use crate::stats::ComboEntry;

/// Keeps combos whose two sides are both on the board (pickable or already
/// selected).
pub fn combos_on_board(combos: &[ComboEntry], on_board: &HashSet<String>) -> Vec<ComboEntry> {
    combos
        .iter()
        .filter(|c| on_board.contains(&c.a) && on_board.contains(&c.b))
        .cloned()
        .collect()
}
