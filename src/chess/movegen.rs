use super::board::Board;
use super::moves::Move;
use super::piece::Piece;
use super::piece::Role;
use super::piece::Side;
use super::square::Square;

const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];
const KING_STEPS: [(i8, i8); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const ROOK_RAYS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_RAYS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

impl Board {
    /// all strictly legal moves for the side to move
    pub fn legal_moves(&self) -> Vec<Move> {
        let us = self.turn;
        self.pseudo_moves()
            .into_iter()
            .filter(|&mv| {
                let next = self.make(mv);
                !next.is_attacked(next.king_square(us), us.flip())
            })
            .collect()
    }

    /// is the square attacked by any piece of the given side
    pub(super) fn is_attacked(&self, target: Square, by: Side) -> bool {
        let pawn = Piece::new(by, Role::Pawn);
        for df in [-1, 1] {
            if let Some(sq) = target.offset(df, -by.forward()) {
                if self.piece_at(sq) == Some(pawn) {
                    return true;
                }
            }
        }
        let knight = Piece::new(by, Role::Knight);
        for (df, dr) in KNIGHT_JUMPS {
            if let Some(sq) = target.offset(df, dr) {
                if self.piece_at(sq) == Some(knight) {
                    return true;
                }
            }
        }
        let king = Piece::new(by, Role::King);
        for (df, dr) in KING_STEPS {
            if let Some(sq) = target.offset(df, dr) {
                if self.piece_at(sq) == Some(king) {
                    return true;
                }
            }
        }
        for (rays, roles) in [
            (ROOK_RAYS, [Role::Rook, Role::Queen]),
            (BISHOP_RAYS, [Role::Bishop, Role::Queen]),
        ] {
            for (df, dr) in rays {
                let mut cursor = target;
                while let Some(sq) = cursor.offset(df, dr) {
                    cursor = sq;
                    match self.piece_at(sq) {
                        None => continue,
                        Some(p) => {
                            if p.side == by && roles.contains(&p.role) {
                                return true;
                            }
                            break;
                        }
                    }
                }
            }
        }
        false
    }

    fn pseudo_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(64);
        for from in Square::all() {
            let piece = match self.piece_at(from) {
                Some(p) if p.side == self.turn => p,
                _ => continue,
            };
            match piece.role {
                Role::Pawn => self.pawn_moves(from, &mut moves),
                Role::Knight => self.jump_moves(from, &KNIGHT_JUMPS, &mut moves),
                Role::King => {
                    self.jump_moves(from, &KING_STEPS, &mut moves);
                    self.castle_moves(from, &mut moves);
                }
                Role::Bishop => self.ray_moves(from, &BISHOP_RAYS, &mut moves),
                Role::Rook => self.ray_moves(from, &ROOK_RAYS, &mut moves),
                Role::Queen => {
                    self.ray_moves(from, &ROOK_RAYS, &mut moves);
                    self.ray_moves(from, &BISHOP_RAYS, &mut moves);
                }
            }
        }
        moves
    }

    fn pawn_moves(&self, from: Square, moves: &mut Vec<Move>) {
        let us = self.turn;
        let forward = us.forward();
        let start_rank = match us {
            Side::White => 1,
            Side::Black => 6,
        };
        if let Some(to) = from.offset(0, forward) {
            if self.piece_at(to).is_none() {
                self.push_pawn_move(from, to, moves);
                if from.rank() == start_rank {
                    let two = to.offset(0, forward).expect("double push on board");
                    if self.piece_at(two).is_none() {
                        moves.push(Move::new(from, two));
                    }
                }
            }
        }
        for df in [-1, 1] {
            if let Some(to) = from.offset(df, forward) {
                let enemy = matches!(self.piece_at(to), Some(p) if p.side != us);
                if enemy {
                    self.push_pawn_move(from, to, moves);
                } else if Some(to) == self.en_passant_square() {
                    moves.push(Move::new(from, to));
                }
            }
        }
    }

    fn push_pawn_move(&self, from: Square, to: Square, moves: &mut Vec<Move>) {
        if to.rank() == self.turn.promotion_rank() {
            for role in [Role::Queen, Role::Rook, Role::Bishop, Role::Knight] {
                moves.push(Move::promote(from, to, role));
            }
        } else {
            moves.push(Move::new(from, to));
        }
    }

    fn jump_moves(&self, from: Square, jumps: &[(i8, i8)], moves: &mut Vec<Move>) {
        for &(df, dr) in jumps {
            if let Some(to) = from.offset(df, dr) {
                match self.piece_at(to) {
                    Some(p) if p.side == self.turn => continue,
                    _ => moves.push(Move::new(from, to)),
                }
            }
        }
    }

    fn ray_moves(&self, from: Square, rays: &[(i8, i8)], moves: &mut Vec<Move>) {
        for &(df, dr) in rays {
            let mut cursor = from;
            while let Some(to) = cursor.offset(df, dr) {
                cursor = to;
                match self.piece_at(to) {
                    None => moves.push(Move::new(from, to)),
                    Some(p) => {
                        if p.side != self.turn {
                            moves.push(Move::new(from, to));
                        }
                        break;
                    }
                }
            }
        }
    }

    /// castling: rights intact, path empty, king never crosses an
    /// attacked square
    fn castle_moves(&self, from: Square, moves: &mut Vec<Move>) {
        let us = self.turn;
        let rank = us.back_rank();
        if from != Square::new(4, rank) {
            return;
        }
        let them = us.flip();
        if self.is_attacked(from, them) {
            return;
        }
        let (king_side, queen_side) = match us {
            Side::White => (self.castling.white_king, self.castling.white_queen),
            Side::Black => (self.castling.black_king, self.castling.black_queen),
        };
        if king_side
            && self.piece_at(Square::new(5, rank)).is_none()
            && self.piece_at(Square::new(6, rank)).is_none()
            && !self.is_attacked(Square::new(5, rank), them)
            && !self.is_attacked(Square::new(6, rank), them)
        {
            moves.push(Move::new(from, Square::new(6, rank)));
        }
        if queen_side
            && self.piece_at(Square::new(3, rank)).is_none()
            && self.piece_at(Square::new(2, rank)).is_none()
            && self.piece_at(Square::new(1, rank)).is_none()
            && !self.is_attacked(Square::new(3, rank), them)
            && !self.is_attacked(Square::new(2, rank), them)
        {
            moves.push(Move::new(from, Square::new(2, rank)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perft(board: &Board, depth: usize) -> usize {
        if depth == 0 {
            return 1;
        }
        board
            .legal_moves()
            .into_iter()
            .map(|mv| perft(&board.make(mv), depth - 1))
            .sum()
    }

    #[test]
    fn perft_from_start() {
        let board = Board::new();
        assert_eq!(perft(&board, 1), 20);
        assert_eq!(perft(&board, 2), 400);
        assert_eq!(perft(&board, 3), 8902);
    }

    #[test]
    fn perft_kiwipete() {
        // classic movegen stress position: castling, en passant,
        // promotions, pins all in play
        let board = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft(&board, 1), 48);
        assert_eq!(perft(&board, 2), 2039);
    }

    #[test]
    fn pinned_piece_cannot_move() {
        // knight on d2 shields the king from the d8 rook
        let board = Board::from_fen("3r4/8/8/8/8/8/3N4/3K4 w - - 0 1").unwrap();
        assert!(
            board
                .legal_moves()
                .iter()
                .all(|mv| mv.from != Square::try_from("d2").unwrap())
        );
    }

    #[test]
    fn check_evasion_only() {
        // king in check from the queen: every reply must resolve it
        let board = Board::from_fen("4k3/8/8/8/8/8/4q3/4K3 w - - 0 1").unwrap();
        for mv in board.legal_moves() {
            let next = board.make(mv);
            assert!(!next.is_attacked(next.king_square(Side::White), Side::Black));
        }
        assert!(!board.legal_moves().is_empty());
    }

    #[test]
    fn promotions_generate_all_roles() {
        let board = Board::from_fen("8/4P3/8/8/8/2k5/8/4K3 w - - 0 1").unwrap();
        let promotions = board
            .legal_moves()
            .into_iter()
            .filter(|mv| mv.promotion.is_some())
            .count();
        assert_eq!(promotions, 4);
    }
}
