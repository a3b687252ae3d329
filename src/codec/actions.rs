use super::mask::ActionMask;
use crate::chess::Board;
use crate::chess::Move;
use crate::chess::Role;
use crate::errors::ChessError;

/// from-to plane index. promotions collapse onto the plain from-to
/// cell, so all four underpromotion variants share one action.
pub fn encode_move(mv: Move) -> usize {
    mv.from.index() * 64 + mv.to.index()
}

/// inverse of encode_move against a concrete position. pawn moves
/// onto the last rank come back as queen promotions.
pub fn decode_action(action: usize, board: &Board) -> Result<Move, ChessError> {
    board
        .legal_moves()
        .into_iter()
        .filter(|&mv| encode_move(mv) == action)
        .max_by_key(|mv| match mv.promotion {
            Some(Role::Queen) => 1,
            _ => 0,
        })
        .ok_or(ChessError::IllegalAction { action })
}

/// the exact image of encode_move over the legal moves
pub fn legal_mask(board: &Board) -> ActionMask {
    board.legal_moves().into_iter().map(encode_move).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::Square;
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn round_trip_on_legal_moves() {
        let board = Board::new();
        for mv in board.legal_moves() {
            let action = encode_move(mv);
            assert_eq!(decode_action(action, &board).unwrap(), mv);
        }
    }

    #[test]
    fn mask_is_image_of_encode_move() {
        // property holds along a seeded random playout
        let mut rng = SmallRng::seed_from_u64(40);
        let mut board = Board::new();
        for _ in 0..40 {
            let moves = board.legal_moves();
            if moves.is_empty() {
                break;
            }
            let mask = legal_mask(&board);
            assert_eq!(mask.count() as usize, {
                let mut actions = moves.iter().map(|&m| encode_move(m)).collect::<Vec<_>>();
                actions.sort_unstable();
                actions.dedup();
                actions.len()
            });
            for &mv in moves.iter() {
                assert!(mask.contains(encode_move(mv)));
            }
            for action in mask.iter() {
                assert!(decode_action(action, &board).is_ok());
            }
            let choice = moves[rng.random_range(0..moves.len())];
            board = board.apply(choice).unwrap();
        }
    }

    #[test]
    fn promotion_decodes_to_queen() {
        let board = Board::from_fen("8/4P3/8/8/8/2k5/8/4K3 w - - 0 1").unwrap();
        let from = Square::try_from("e7").unwrap();
        let to = Square::try_from("e8").unwrap();
        let action = from.index() * 64 + to.index();
        let decoded = decode_action(action, &board).unwrap();
        assert_eq!(decoded.promotion, Some(Role::Queen));
    }

    #[test]
    fn illegal_action_is_an_error() {
        let board = Board::new();
        // e2e5 is not reachable for any piece
        let action = Square::try_from("e2").unwrap().index() * 64
            + Square::try_from("e5").unwrap().index();
        assert!(decode_action(action, &board).is_err());
    }
}
