//! Text-command orchestrator (L9): a thin loop translating stdin lines into
//! calls on the board/search/eval layers. Owns exactly one `Board`, one
//! `TranspositionTable`, and one evaluator; never does move generation or
//! search math itself. Runs `go` on a worker thread so `stop` (typed while a
//! search is in flight) can set a shared flag the searcher polls.

use corvid::board::{Board, Color};
use corvid::eval::classical::ClassicalEvaluator;
use corvid::eval::nnue::NnueEvaluator;
use corvid::eval::Evaluator;
use corvid::moves::execute::generate_legal;
use corvid::moves::types::Move;
use corvid::search::search::{allocate_time, iterative_deepening, SearchReport, TimeManager};
use corvid::search::tt::{TranspositionTable, MATE_THRESHOLD};
use corvid::square::Square;
use std::io::{self, BufRead};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const DEFAULT_HASH_MB: usize = 16;

enum ActiveEvaluator {
    Classical(ClassicalEvaluator),
    Nnue(NnueEvaluator),
}

impl Evaluator for ActiveEvaluator {
    fn static_eval(&mut self, board: &Board) -> i32 {
        match self {
            ActiveEvaluator::Classical(e) => e.static_eval(board),
            ActiveEvaluator::Nnue(e) => e.static_eval(board),
        }
    }
    fn add_piece(&mut self, board: &Board, color: Color, piece: corvid::board::Piece, sq: Square) {
        match self {
            ActiveEvaluator::Classical(e) => e.add_piece(board, color, piece, sq),
            ActiveEvaluator::Nnue(e) => e.add_piece(board, color, piece, sq),
        }
    }
    fn remove_piece(&mut self, board: &Board, color: Color, piece: corvid::board::Piece, sq: Square) {
        match self {
            ActiveEvaluator::Classical(e) => e.remove_piece(board, color, piece, sq),
            ActiveEvaluator::Nnue(e) => e.remove_piece(board, color, piece, sq),
        }
    }
    fn snapshot(&mut self, ply: usize) {
        match self {
            ActiveEvaluator::Classical(e) => e.snapshot(ply),
            ActiveEvaluator::Nnue(e) => e.snapshot(ply),
        }
    }
    fn restore(&mut self, ply: usize) {
        match self {
            ActiveEvaluator::Classical(e) => e.restore(ply),
            ActiveEvaluator::Nnue(e) => e.restore(ply),
        }
    }
}

struct Engine {
    board: Board,
    tt: TranspositionTable,
    evaluator: ActiveEvaluator,
    nnue_path: Option<String>,
    prefer_classical: bool,
}

impl Engine {
    fn new() -> Self {
        Self {
            board: Board::new(),
            tt: TranspositionTable::new(DEFAULT_HASH_MB),
            evaluator: ActiveEvaluator::Classical(ClassicalEvaluator::new()),
            nnue_path: None,
            prefer_classical: true,
        }
    }

    fn new_game(&mut self) {
        self.board = Board::new();
        self.tt.clear();
    }

    fn set_hash(&mut self, mb: usize) {
        self.tt = TranspositionTable::new(mb.clamp(1, 4096));
    }

    fn load_nnue(&mut self, path: &str) {
        self.nnue_path = Some(path.to_string());
        let mut nnue = NnueEvaluator::new();
        match nnue.load(Path::new(path)) {
            Ok(()) => {
                nnue.refresh(&self.board);
                if !self.prefer_classical {
                    self.evaluator = ActiveEvaluator::Nnue(nnue);
                }
                println!("info string NNUE network loaded from {path}");
            }
            Err(err) => {
                println!("info string {err}, falling back to classical evaluation");
            }
        }
    }

    fn set_classical_eval(&mut self, classical_only: bool) {
        self.prefer_classical = classical_only;
        if classical_only {
            self.evaluator = ActiveEvaluator::Classical(ClassicalEvaluator::new());
        } else if let Some(path) = self.nnue_path.clone() {
            self.load_nnue(&path);
        }
    }
}

fn main() {
    let mut engine = Engine::new();
    let (tx, rx) = mpsc::channel::<String>();

    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) => {
                    if tx.send(l).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    let stop_flag = Arc::new(AtomicBool::new(false));

    while let Ok(line) = rx.recv() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts[0] {
            "uci" => {
                println!("id name Corvid");
                println!("id author the corvid team");
                println!("uciok");
            }
            "isready" => println!("readyok"),
            "new_game" | "ucinewgame" => engine.new_game(),
            "set_position" | "position" => handle_position(&mut engine.board, &parts),
            "go" => handle_go(&mut engine, &parts, &rx, &stop_flag),
            "stop" => stop_flag.store(true, Ordering::Relaxed),
            "set_option" | "setoption" => handle_set_option(&mut engine, &parts),
            "fen" => println!("{}", engine.board.to_fen()),
            "d" | "display" => println!("{}", engine.board),
            "quit" => break,
            _ => {}
        }
    }
}

fn handle_position(board: &mut Board, parts: &[&str]) {
    if parts.len() < 2 {
        return;
    }
    let new_board = if parts[1] == "startpos" {
        Board::new()
    } else if parts[1] == "fen" {
        let moves_idx = parts.iter().position(|&p| p == "moves").unwrap_or(parts.len());
        let fen = parts[2..moves_idx].join(" ");
        match Board::from_str(&fen) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("info string {e}");
                return;
            }
        }
    } else {
        return;
    };
    *board = new_board;

    if let Some(moves_idx) = parts.iter().position(|&p| p == "moves") {
        for mv_str in &parts[moves_idx + 1..] {
            match parse_uci_move(board, mv_str) {
                Some(mv) => corvid::moves::execute::make_move(board, mv),
                None => {
                    eprintln!("info string illegal move in position command: {mv_str}");
                    return;
                }
            }
        }
    }
}

fn parse_uci_move(board: &Board, text: &str) -> Option<Move> {
    use arrayvec::ArrayVec;
    if text.len() < 4 {
        return None;
    }
    let from = Square::from_str(&text[0..2]).ok()?;
    let to = Square::from_str(&text[2..4]).ok()?;
    let promo = text.chars().nth(4).and_then(|c| match c {
        'q' => Some(corvid::board::Piece::Queen),
        'r' => Some(corvid::board::Piece::Rook),
        'b' => Some(corvid::board::Piece::Bishop),
        'n' => Some(corvid::board::Piece::Knight),
        _ => None,
    });

    let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
    generate_legal(board, &mut moves);
    moves.into_iter().find(|m| m.from() == from && m.to() == to && m.promotion() == promo)
}

fn handle_set_option(engine: &mut Engine, parts: &[&str]) {
    let name_idx = parts.iter().position(|&p| p == "name");
    let value_idx = parts.iter().position(|&p| p == "value");
    let Some(name_idx) = name_idx else { return };
    let name_end = value_idx.unwrap_or(parts.len());
    let name = parts[name_idx + 1..name_end].join(" ");
    let value = value_idx.map(|vi| parts[vi + 1..].join(" "));

    match name.as_str() {
        "Hash" => {
            if let Some(v) = value.and_then(|v| v.parse::<usize>().ok()) {
                engine.set_hash(v);
            }
        }
        "ClearHash" => engine.tt.clear(),
        "ClassicalEval" => {
            let on = value.as_deref() == Some("true");
            engine.set_classical_eval(on);
        }
        "NNUE_Path" => {
            if let Some(path) = value {
                engine.load_nnue(&path);
            }
        }
        "Ponder" => {}
        _ => {}
    }
}

struct GoLimits {
    depth: i32,
    soft: Option<Duration>,
    hard: Option<Duration>,
    nodes: Option<u64>,
}

fn parse_go(board: &Board, parts: &[&str]) -> GoLimits {
    let mut depth = 64;
    let mut movetime = None;
    let mut nodes = None;
    let mut wtime = None;
    let mut btime = None;
    let mut winc = Duration::ZERO;
    let mut binc = Duration::ZERO;
    let mut movestogo = None;
    let mut infinite = false;

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" if i + 1 < parts.len() => {
                depth = parts[i + 1].parse().unwrap_or(64);
                i += 2;
            }
            "nodes" if i + 1 < parts.len() => {
                nodes = parts[i + 1].parse().ok();
                i += 2;
            }
            "movetime" if i + 1 < parts.len() => {
                movetime = parts[i + 1].parse::<u64>().ok().map(Duration::from_millis);
                i += 2;
            }
            "wtime" if i + 1 < parts.len() => {
                wtime = parts[i + 1].parse::<u64>().ok().map(Duration::from_millis);
                i += 2;
            }
            "btime" if i + 1 < parts.len() => {
                btime = parts[i + 1].parse::<u64>().ok().map(Duration::from_millis);
                i += 2;
            }
            "winc" if i + 1 < parts.len() => {
                winc = parts[i + 1].parse::<u64>().ok().map(Duration::from_millis).unwrap_or_default();
                i += 2;
            }
            "binc" if i + 1 < parts.len() => {
                binc = parts[i + 1].parse::<u64>().ok().map(Duration::from_millis).unwrap_or_default();
                i += 2;
            }
            "movestogo" if i + 1 < parts.len() => {
                movestogo = parts[i + 1].parse().ok();
                i += 2;
            }
            "infinite" => {
                infinite = true;
                i += 1;
            }
            _ => i += 1,
        }
    }

    if infinite {
        return GoLimits { depth: 100, soft: None, hard: None, nodes };
    }
    if let Some(mt) = movetime {
        return GoLimits { depth, soft: Some(mt), hard: Some(mt), nodes };
    }

    let (my_time, my_inc) = if board.side_to_move == Color::White { (wtime, winc) } else { (btime, binc) };
    if let Some(t) = my_time {
        let (soft, hard) = allocate_time(t, my_inc, movestogo);
        GoLimits { depth, soft: Some(soft), hard: Some(hard), nodes }
    } else {
        GoLimits { depth, soft: None, hard: None, nodes }
    }
}

fn format_score(score: i32) -> String {
    if score.abs() >= MATE_THRESHOLD {
        let moves_to_mate = (31000 - score.abs() + 1) / 2;
        if score > 0 { format!("mate {moves_to_mate}") } else { format!("mate -{moves_to_mate}") }
    } else {
        format!("cp {score}")
    }
}

fn print_progress(report: &SearchReport) {
    let pv = report.best_move.map(|m| m.to_uci()).unwrap_or_default();
    let nps = if report.elapsed.as_millis() > 0 {
        report.nodes * 1000 / report.elapsed.as_millis() as u64
    } else {
        0
    };
    println!(
        "info depth {} score {} time {} nodes {} nps {} pv {}",
        report.depth,
        format_score(report.score),
        report.elapsed.as_millis(),
        report.nodes,
        nps,
        pv
    );
}

fn handle_go(engine: &mut Engine, parts: &[&str], rx: &mpsc::Receiver<String>, stop_flag: &Arc<AtomicBool>) {
    let limits = parse_go(&engine.board, parts);
    stop_flag.store(false, Ordering::Relaxed);

    let mut board = engine.board.clone();
    let mut tt = std::mem::replace(&mut engine.tt, TranspositionTable::new(1));
    let mut evaluator = std::mem::replace(&mut engine.evaluator, ActiveEvaluator::Classical(ClassicalEvaluator::new()));
    let depth = limits.depth;
    let flag = Arc::clone(stop_flag);

    let (done_tx, done_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let mut time = TimeManager::new(limits.soft, limits.hard, limits.nodes).with_external_stop(flag.clone());
        let (score, best_move) =
            iterative_deepening(&mut board, &mut evaluator, &mut tt, depth, &mut time, |report| {
                print_progress(report);
            });
        let _ = done_tx.send(());
        (board, tt, evaluator, score, best_move, flag)
    });

    loop {
        if done_rx.try_recv().is_ok() {
            break;
        }
        match rx.recv_timeout(Duration::from_millis(20)) {
            Ok(line) if line.trim() == "stop" => {
                stop_flag.store(true, Ordering::Relaxed);
            }
            Ok(_) => {}
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
        if handle.is_finished() {
            break;
        }
    }

    let (board, tt, evaluator, _score, best_move, _flag) = handle.join().expect("search thread panicked");
    engine.board = board;
    engine.tt = tt;
    engine.evaluator = evaluator;

    match best_move {
        Some(mv) => println!("bestmove {}", mv.to_uci()),
        None => println!("bestmove 0000"),
    }
}
