use crate::FEATURES;
use crate::chess::Board;
use crate::chess::Side;
use crate::chess::Square;

const PLANES: usize = 12 * 64;
const EN_PASSANT: usize = PLANES;
const CASTLING: usize = EN_PASSANT + 64;
const SIDE_TO_MOVE: usize = CASTLING + 4;
const CLOCKS: usize = SIDE_TO_MOVE + 1;

/// dense 839-feature encoding of a position. pure function of the
/// canonical position, so two boards with equal fen encode equally.
pub fn encode_state(board: &Board) -> Vec<f32> {
    let mut features = vec![0.0; FEATURES];
    for sq in Square::all() {
        if let Some(piece) = board.piece_at(sq) {
            features[piece.plane() * 64 + sq.index()] = 1.0;
        }
    }
    if let Some(sq) = board.en_passant_square() {
        features[EN_PASSANT + sq.index()] = 1.0;
    }
    for (i, right) in board.castling_rights().into_iter().enumerate() {
        if right {
            features[CASTLING + i] = 1.0;
        }
    }
    features[SIDE_TO_MOVE] = match board.side_to_move() {
        Side::White => 1.0,
        Side::Black => 0.0,
    };
    features[CLOCKS] = (board.halfmove_clock() as f32 / 100.0).min(1.0);
    features[CLOCKS + 1] = (board.fullmove_number() as f32 / 100.0).min(1.0);
    features
}
