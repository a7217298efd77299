use crate::catalog::Catalog;
use crate::error::Result;
use crate::events::{Decision, EventInterpreter, PlayerEvent};
use crate::types::*;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Sequential,
    Random,
}

/// What the player should do in response to a player event.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackAction {
    None,
    Play,
    Load(ResolvedClip),
}

/// Cursor state saved by [`Sequencer::position`].
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    index: usize,
    last: Option<ResolvedClip>,
    random_cursor: Option<usize>,
}

#[derive(Debug, Clone)]
struct RandomOrder {
    order: Vec<usize>,
    cursor: usize,
}

/// Owns the playback cursor over a catalog.
///
/// The cursor holds the raw index of the last record consumed by the most
/// recent resolve, so a merged clip at `i` absorbing `m` records leaves the
/// cursor at `i + m`. Before the first move it sits on the last record, so the
/// first `get_next` lands on index 0.
#[derive(Debug, Clone)]
pub struct Sequencer {
    catalog: Catalog,
    default_duration: Seconds,
    index: usize,
    last: Option<ResolvedClip>,
    random: Option<RandomOrder>,
    interpreter: EventInterpreter,
}

impl Sequencer {
    pub fn new(catalog: Catalog, default_duration: Seconds) -> Self {
        let index = catalog.len().saturating_sub(1);
        Self {
            catalog,
            default_duration: default_duration.clamp(Seconds(1), Seconds::MAX_OFFSET),
            index,
            last: None,
            random: None,
            interpreter: EventInterpreter::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cursor(&self) -> usize {
        self.index
    }

    /// The clip most recently returned by a cursor move.
    pub fn current(&self) -> Option<&ResolvedClip> {
        self.last.as_ref()
    }

    pub fn position(&self) -> Position {
        Position {
            index: self.index,
            last: self.last.clone(),
            random_cursor: self.random.as_ref().map(|r| r.cursor),
        }
    }

    /// Move the cursor back to a saved position. A saved shuffle cursor is
    /// only applied while the same random mode is still active.
    pub fn restore(&mut self, position: Position) {
        self.index = position.index;
        self.last = position.last;
        if let (Some(random), Some(cursor)) = (self.random.as_mut(), position.random_cursor) {
            random.cursor = cursor;
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        if self.random.is_some() {
            PlaybackMode::Random
        } else {
            PlaybackMode::Sequential
        }
    }

    pub fn default_duration(&self) -> Seconds {
        self.default_duration
    }

    /// Applies to every resolve after this call. Zero is raised to one second.
    pub fn set_default_duration(&mut self, duration: Seconds) {
        self.default_duration = duration.clamp(Seconds(1), Seconds::MAX_OFFSET);
    }

    /// Resolve the clip starting at `index` without moving the cursor.
    pub fn resolve(&self, index: usize) -> Result<ResolvedClip> {
        self.catalog.at(index)?;
        Ok(self.merge_forward(index))
    }

    // Absorb following records of the same video while they overlap or touch.
    fn merge_forward(&self, index: usize) -> ResolvedClip {
        let clips = self.catalog.clips();
        let first = &clips[index];
        let mut end = first.effective_end(self.default_duration);
        let mut recommenders: Vec<String> = Vec::with_capacity(first.recommenders.len());
        extend_unique(&mut recommenders, &first.recommenders);

        let mut merge_count = 0;
        let mut i = index;
        while i + 1 < clips.len() {
            let next = &clips[i + 1];
            if next.video_id != first.video_id || end < next.start {
                break;
            }
            end = end.max(next.effective_end(self.default_duration));
            extend_unique(&mut recommenders, &next.recommenders);
            merge_count += 1;
            i += 1;
        }

        ResolvedClip {
            index,
            video_id: first.video_id.clone(),
            title: first.title.clone(),
            start: first.start,
            end,
            duration: end - first.start,
            recommenders,
            merge_count,
        }
    }

    fn enter(&mut self, start: usize) -> ResolvedClip {
        let clip = self.merge_forward(start);
        self.index = clip.last_index();
        tracing::debug!(
            "Cursor at {} ({} merged), {} {}-{}",
            clip.index,
            clip.merge_count,
            clip.video_id,
            clip.start.0,
            clip.end.0
        );
        self.last = Some(clip.clone());
        clip
    }

    /// Start indices of the resolved clips met walking forward from index 0.
    pub fn segment_starts(&self) -> Vec<usize> {
        let mut starts = Vec::new();
        let mut i = 0;
        while i < self.catalog.len() {
            starts.push(i);
            i = self.merge_forward(i).last_index() + 1;
        }
        starts
    }

    fn segment_start_containing(&self, raw: usize) -> usize {
        self.segment_starts()
            .into_iter()
            .take_while(|&start| start <= raw)
            .last()
            .unwrap_or(0)
    }

    pub fn get_next(&mut self) -> ResolvedClip {
        let start = (self.index + 1) % self.catalog.len();
        self.enter(start)
    }

    /// Step back over the records the current clip absorbed, then one more,
    /// landing on the start of the resolved clip covering that record.
    pub fn get_previous(&mut self) -> ResolvedClip {
        let len = self.catalog.len();
        let raw = match &self.last {
            None => len - 1,
            Some(last) => {
                let back = self.index as isize - last.merge_count as isize - 1;
                if back < 0 {
                    len - 1
                } else {
                    back as usize
                }
            }
        };
        let start = self.segment_start_containing(raw);
        self.enter(start)
    }

    /// Shuffle the resolved clips into a fresh order and move to its first entry.
    pub fn enable_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ResolvedClip {
        let mut order = self.segment_starts();
        for i in (1..order.len()).rev() {
            let j = rng.gen_range(0..=i);
            order.swap(i, j);
        }
        let first = order[0];
        tracing::debug!("Random order over {} clips", order.len());
        self.random = Some(RandomOrder { order, cursor: 0 });
        self.enter(first)
    }

    /// Leave random mode and return to the first clip.
    pub fn disable_random(&mut self) -> ResolvedClip {
        self.random = None;
        self.enter(0)
    }

    pub fn get_next_random(&mut self) -> ResolvedClip {
        let Some(random) = self.random.as_mut() else {
            return self.get_next();
        };
        random.cursor = (random.cursor + 1) % random.order.len();
        let start = random.order[random.cursor];
        self.enter(start)
    }

    pub fn get_previous_random(&mut self) -> ResolvedClip {
        let Some(random) = self.random.as_mut() else {
            return self.get_previous();
        };
        random.cursor = random
            .cursor
            .checked_sub(1)
            .unwrap_or(random.order.len() - 1);
        let start = random.order[random.cursor];
        self.enter(start)
    }

    /// Move in `direction` using the current playback mode.
    pub fn advance(&mut self, direction: Direction) -> ResolvedClip {
        match (self.mode(), direction) {
            (PlaybackMode::Sequential, Direction::Next) => self.get_next(),
            (PlaybackMode::Sequential, Direction::Previous) => self.get_previous(),
            (PlaybackMode::Random, Direction::Next) => self.get_next_random(),
            (PlaybackMode::Random, Direction::Previous) => self.get_previous_random(),
        }
    }

    pub fn on_player_event(&mut self, event: PlayerEvent) -> PlaybackAction {
        match self.interpreter.interpret(event, self.last.as_ref()) {
            Decision::Ignore => PlaybackAction::None,
            Decision::Play => PlaybackAction::Play,
            Decision::Advance => PlaybackAction::Load(self.advance(Direction::Next)),
        }
    }
}

fn extend_unique(into: &mut Vec<String>, names: &[String]) {
    for name in names {
        if !into.contains(name) {
            into.push(name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::events::{ErrorCode, PlayerStatus};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rec(video: &str, start: u32, end: u32, recommenders: &[&str]) -> ClipRecord {
        ClipRecord {
            video_id: video.to_string(),
            title: format!("{} {}", video, start),
            start: Seconds(start),
            end: Seconds(end),
            recommenders: recommenders.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn sequencer(records: Vec<ClipRecord>, default_duration: u32) -> Sequencer {
        Sequencer::new(Catalog::new("chan", records).unwrap(), Seconds(default_duration))
    }

    /// Segments: [0 (+1)], [2], [3 (+1)], [5].
    fn merged_catalog() -> Sequencer {
        sequencer(
            vec![
                rec("A", 0, 30, &["x"]),
                rec("A", 20, 40, &["y"]),
                rec("B", 0, 10, &[]),
                rec("C", 0, 20, &["z"]),
                rec("C", 10, 50, &["z"]),
                rec("D", 0, 10, &[]),
            ],
            60,
        )
    }

    fn state(status: PlayerStatus, elapsed: u32) -> PlayerEvent {
        PlayerEvent::StateChanged {
            status,
            elapsed: Seconds(elapsed),
        }
    }

    #[test]
    fn open_ends_merge_through_default_duration() {
        let seq = sequencer(vec![rec("A", 0, 0, &["x"]), rec("A", 50, 0, &["y"])], 60);
        let clip = seq.resolve(0).unwrap();
        assert_eq!(clip.start, Seconds(0));
        assert_eq!(clip.end, Seconds(110));
        assert_eq!(clip.duration, Seconds(110));
        assert_eq!(clip.recommenders, vec!["x", "y"]);
        assert_eq!(clip.merge_count, 1);
    }

    #[test]
    fn different_video_does_not_merge() {
        let seq = sequencer(vec![rec("A", 0, 30, &["x"]), rec("B", 10, 0, &["y"])], 60);
        let clip = seq.resolve(0).unwrap();
        assert_eq!(clip.start, Seconds(0));
        assert_eq!(clip.end, Seconds(30));
        assert_eq!(clip.duration, Seconds(30));
        assert_eq!(clip.recommenders, vec!["x"]);
        assert_eq!(clip.merge_count, 0);
    }

    #[test]
    fn merge_chains_while_records_touch() {
        let seq = sequencer(
            vec![
                rec("A", 0, 30, &["x"]),
                rec("A", 30, 40, &["y"]),
                rec("A", 35, 100, &["x", "z"]),
                rec("A", 101, 120, &[]),
            ],
            60,
        );
        let clip = seq.resolve(0).unwrap();
        assert_eq!(clip.end, Seconds(100));
        assert_eq!(clip.merge_count, 2);
        assert_eq!(clip.recommenders, vec!["x", "y", "z"]);
        assert_eq!(seq.resolve(3).unwrap().merge_count, 0);
    }

    #[test]
    fn merge_never_shrinks_end() {
        let seq = sequencer(vec![rec("A", 0, 100, &[]), rec("A", 10, 20, &[])], 60);
        let clip = seq.resolve(0).unwrap();
        assert_eq!(clip.end, Seconds(100));
        assert_eq!(clip.merge_count, 1);
    }

    #[test]
    fn merge_stops_at_last_record() {
        let seq = sequencer(vec![rec("A", 0, 30, &[]), rec("A", 20, 40, &[])], 60);
        let clip = seq.resolve(1).unwrap();
        assert_eq!(clip.merge_count, 0);
        assert_eq!(clip.end, Seconds(40));
    }

    #[test]
    fn every_position_resolves_to_positive_duration() {
        let seq = merged_catalog();
        for index in 0..seq.catalog().len() {
            let clip = seq.resolve(index).unwrap();
            assert!(clip.end > clip.start);
            assert_eq!(clip.duration, clip.end - clip.start);
        }
    }

    #[test]
    fn open_end_at_offset_limit_stays_positive() {
        let mut seq = sequencer(vec![rec("A", Seconds::MAX_OFFSET.0, 0, &[])], u32::MAX);
        assert_eq!(seq.default_duration(), Seconds::MAX_OFFSET);
        let clip = seq.resolve(0).unwrap();
        assert!(clip.end > clip.start);
        assert_eq!(clip.duration, Seconds::MAX_OFFSET);

        seq.set_default_duration(Seconds(u32::MAX));
        assert!(seq.resolve(0).unwrap().end > clip.start);
    }

    #[test]
    fn resolve_out_of_range() {
        let seq = merged_catalog();
        assert!(matches!(
            seq.resolve(6),
            Err(CoreError::IndexOutOfRange { index: 6, len: 6 })
        ));
    }

    #[test]
    fn first_next_lands_on_index_zero() {
        let mut seq = merged_catalog();
        assert!(seq.current().is_none());
        let clip = seq.get_next();
        assert_eq!(clip.index, 0);
        assert_eq!(seq.cursor(), 1);
        assert_eq!(seq.current(), Some(&clip));
    }

    #[test]
    fn next_walks_resolved_clips_and_wraps() {
        let mut seq = merged_catalog();
        let landed: Vec<usize> = (0..5).map(|_| seq.get_next().index).collect();
        assert_eq!(landed, vec![0, 2, 3, 5, 0]);
    }

    #[test]
    fn n_steps_return_to_start_without_merges() {
        let mut seq = sequencer(
            vec![
                rec("A", 0, 10, &[]),
                rec("B", 0, 10, &[]),
                rec("C", 0, 10, &[]),
                rec("D", 0, 10, &[]),
            ],
            60,
        );
        seq.get_next();
        seq.get_next();
        let start = seq.cursor();
        for _ in 0..seq.catalog().len() {
            seq.get_next();
        }
        assert_eq!(seq.cursor(), start);
    }

    #[test]
    fn next_then_previous_round_trips() {
        let mut seq = merged_catalog();
        let mut before = seq.get_next();
        for _ in 0..8 {
            seq.get_next();
            let back = seq.get_previous();
            assert_eq!(back, before);
            before = seq.get_next();
        }
    }

    #[test]
    fn consecutive_previous_steps_land_on_clip_starts() {
        let mut seq = merged_catalog();
        for _ in 0..4 {
            seq.get_next();
        }
        assert_eq!(seq.current().map(|c| c.index), Some(5));
        let landed: Vec<usize> = (0..5).map(|_| seq.get_previous().index).collect();
        assert_eq!(landed, vec![3, 2, 0, 5, 3]);
    }

    #[test]
    fn previous_before_any_clip_lands_on_last_clip() {
        let mut seq = merged_catalog();
        assert_eq!(seq.get_previous().index, 5);

        let mut seq = sequencer(vec![rec("A", 0, 10, &[]), rec("A", 5, 20, &[])], 60);
        let clip = seq.get_previous();
        assert_eq!(clip.index, 0);
        assert_eq!(clip.merge_count, 1);
    }

    #[test]
    fn single_record_catalog_stays_put() {
        let mut seq = sequencer(vec![rec("A", 5, 0, &[])], 60);
        assert_eq!(seq.get_next().index, 0);
        assert_eq!(seq.get_next().index, 0);
        assert_eq!(seq.get_previous().index, 0);
        assert_eq!(seq.current().unwrap().end, Seconds(65));
    }

    #[test]
    fn segment_starts_follow_merges() {
        assert_eq!(merged_catalog().segment_starts(), vec![0, 2, 3, 5]);
    }

    #[test]
    fn random_order_covers_each_clip_once() {
        let mut seq = merged_catalog();
        let mut rng = StdRng::seed_from_u64(7);
        let first = seq.enable_random(&mut rng);
        assert_eq!(seq.mode(), PlaybackMode::Random);

        let mut landed = vec![first.index];
        for _ in 1..4 {
            landed.push(seq.get_next_random().index);
        }
        let mut sorted = landed.clone();
        sorted.sort();
        assert_eq!(sorted, seq.segment_starts());

        // Wraps to the same order.
        assert_eq!(seq.get_next_random().index, landed[0]);
        assert_eq!(seq.get_previous_random().index, landed[3]);
        assert_eq!(seq.get_previous_random().index, landed[2]);
    }

    #[test]
    fn random_clips_are_fully_merged() {
        let mut seq = merged_catalog();
        let mut rng = StdRng::seed_from_u64(42);
        seq.enable_random(&mut rng);
        for _ in 0..4 {
            let clip = seq.get_next_random();
            if clip.index == 0 || clip.index == 3 {
                assert_eq!(clip.merge_count, 1);
            }
        }
    }

    #[test]
    fn disable_random_returns_to_first_clip() {
        let mut seq = merged_catalog();
        let mut rng = StdRng::seed_from_u64(1);
        seq.enable_random(&mut rng);
        seq.get_next_random();

        let clip = seq.disable_random();
        assert_eq!(clip.index, 0);
        assert_eq!(seq.mode(), PlaybackMode::Sequential);
        assert_eq!(seq.get_next().index, 2);
    }

    #[test]
    fn random_moves_fall_back_to_sequential_when_disabled() {
        let mut seq = merged_catalog();
        assert_eq!(seq.get_next_random().index, 0);
        assert_eq!(seq.get_next_random().index, 2);
        assert_eq!(seq.get_previous_random().index, 0);
    }

    #[test]
    fn advance_follows_mode() {
        let mut seq = merged_catalog();
        assert_eq!(seq.advance(Direction::Next).index, 0);
        assert_eq!(seq.advance(Direction::Next).index, 2);
        assert_eq!(seq.advance(Direction::Previous).index, 0);
    }

    #[test]
    fn restore_returns_to_saved_position() {
        let mut seq = merged_catalog();
        seq.get_next();
        let saved = seq.position();
        seq.get_next();
        seq.get_next();
        seq.restore(saved);
        assert_eq!(seq.cursor(), 1);
        assert_eq!(seq.current().map(|c| c.index), Some(0));
        assert_eq!(seq.get_next().index, 2);

        let mut rng = StdRng::seed_from_u64(5);
        let first = seq.enable_random(&mut rng);
        let saved = seq.position();
        seq.get_next_random();
        seq.restore(saved);
        assert_eq!(seq.current(), Some(&first));
    }

    #[test]
    fn default_duration_change_applies_to_later_resolves() {
        let mut seq = sequencer(vec![rec("A", 10, 0, &[])], 60);
        assert_eq!(seq.resolve(0).unwrap().end, Seconds(70));
        seq.set_default_duration(Seconds(30));
        assert_eq!(seq.resolve(0).unwrap().end, Seconds(40));
        seq.set_default_duration(Seconds::ZERO);
        assert_eq!(seq.default_duration(), Seconds(1));
        assert_eq!(seq.resolve(0).unwrap().duration, Seconds(1));
    }

    #[test]
    fn playing_then_ended_advances_once() {
        let mut seq = sequencer(vec![rec("A", 10, 40, &[]), rec("B", 20, 50, &[])], 60);
        seq.get_next();

        assert_eq!(seq.on_player_event(state(PlayerStatus::Playing, 12)), PlaybackAction::None);
        match seq.on_player_event(state(PlayerStatus::Ended, 40)) {
            PlaybackAction::Load(clip) => assert_eq!(clip.video_id, "B"),
            other => panic!("expected a load, got {:?}", other),
        }
        // Repeated end signal for the old video before the new one plays.
        assert_eq!(seq.on_player_event(state(PlayerStatus::Ended, 0)), PlaybackAction::None);
        assert_eq!(seq.cursor(), 1);
    }

    #[test]
    fn unplayable_error_skips_to_next() {
        let mut seq = merged_catalog();
        seq.get_next();
        match seq.on_player_event(PlayerEvent::Error(ErrorCode::EMBED_RESTRICTED_ALT)) {
            PlaybackAction::Load(clip) => assert_eq!(clip.index, 2),
            other => panic!("expected a load, got {:?}", other),
        }
        assert_eq!(seq.on_player_event(PlayerEvent::Error(ErrorCode::HTML5)), PlaybackAction::None);
        assert_eq!(seq.current().map(|c| c.index), Some(2));
    }

    #[test]
    fn ready_requests_play() {
        let mut seq = merged_catalog();
        assert_eq!(seq.on_player_event(PlayerEvent::Ready), PlaybackAction::Play);
        assert_eq!(seq.on_player_event(PlayerEvent::QualityChanged), PlaybackAction::None);
    }
}
