use crate::model::Song;

/// Source context a song was launched from. Previous/next always navigate
/// the queue matching this tag, never the one the user happens to be
/// looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueContext {
    Home,
    Library,
}

/// The two independently loaded song lists. Each list is replaced wholesale
/// when refetched; nothing ever splices them in place.
#[derive(Debug, Default)]
pub struct QueueTable {
    home: Vec<Song>,
    library: Vec<Song>,
}

impl QueueTable {
    pub fn set(&mut self, context: QueueContext, songs: Vec<Song>) {
        match context {
            QueueContext::Home => self.home = songs,
            QueueContext::Library => self.library = songs,
        }
    }

    pub fn get(&self, context: QueueContext) -> &[Song] {
        match context {
            QueueContext::Home => &self.home,
            QueueContext::Library => &self.library,
        }
    }

    fn position_of(&self, context: QueueContext, song: &Song) -> Option<usize> {
        self.get(context)
            .iter()
            .position(|candidate| candidate.name == song.name)
    }

    /// Circular predecessor of `current`. Index 0 wraps to the end; a song
    /// missing from the queue restarts navigation from the end.
    pub fn previous(&self, context: QueueContext, current: &Song) -> Option<Song> {
        let songs = self.get(context);
        if songs.is_empty() {
            return None;
        }
        let len = songs.len();
        let index = match self.position_of(context, current) {
            Some(i) => (i + len - 1) % len,
            None => len - 1,
        };
        songs.get(index).cloned()
    }

    /// Circular successor of `current`. The last index wraps to 0; a song
    /// missing from the queue restarts navigation from the front.
    pub fn next(&self, context: QueueContext, current: &Song) -> Option<Song> {
        let songs = self.get(context);
        if songs.is_empty() {
            return None;
        }
        let len = songs.len();
        let index = match self.position_of(context, current) {
            Some(i) => (i + 1) % len,
            None => 0,
        };
        songs.get(index).cloned()
    }
}
