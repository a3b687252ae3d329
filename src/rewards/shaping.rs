use crate::Reward;
use crate::chess::Board;
use crate::chess::Role;
use crate::chess::Side;
use crate::chess::Square;

/// material balance from the given side's perspective, in pawns
pub fn material(board: &Board, side: Side) -> Reward {
    Square::all()
        .filter_map(|sq| board.piece_at(sq))
        .map(|p| {
            if p.side == side {
                p.role.value()
            } else {
                -p.role.value()
            }
        })
        .sum()
}

/// crude development balance: pieces off the back rank and pawns
/// off their start rank, own minus opponent
pub fn activity(board: &Board, side: Side) -> Reward {
    developed(board, side) - developed(board, side.flip())
}

fn developed(board: &Board, side: Side) -> Reward {
    Square::all()
        .filter_map(|sq| board.piece_at(sq).map(|p| (p, sq)))
        .filter(|(p, _)| p.side == side)
        .filter(|(p, sq)| match p.role {
            Role::Pawn => sq.rank() != pawn_rank(side),
            Role::King => false,
            _ => sq.rank() != side.back_rank(),
        })
        .count() as Reward
}

fn pawn_rank(side: Side) -> u8 {
    match side {
        Side::White => 1,
        Side::Black => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::Move;

    #[test]
    fn start_position_is_balanced() {
        let board = Board::new();
        assert_eq!(material(&board, Side::White), 0.0);
        assert_eq!(activity(&board, Side::White), 0.0);
    }

    #[test]
    fn developing_a_pawn_counts() {
        let board = Board::new().apply(Move::try_from("e2e4").unwrap()).unwrap();
        assert_eq!(activity(&board, Side::White), 1.0);
        assert_eq!(activity(&board, Side::Black), -1.0);
    }
}
