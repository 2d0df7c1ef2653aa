//! Deliberation Session Controller
//!
//! One actor task per session. The task owns the [`DeliberationSession`]
//! aggregate and is its only writer; everything else talks to it through a
//! [`ControllerHandle`] that sends [`ControllerCommand`]s with oneshot replies.
//!
//! # State machine
//!
//! ```text
//! Idle --start--> Starting --> RoundActive --> NoteWindow --+--> RoundActive ...
//!                                                           |
//!                                                           +--> Ended (after the last round)
//! skip: any non-terminal phase --> Ended
//! Ended --(no command for `ended_retention`)--> task stops
//! ```
//!
//! While a speech is streaming, read-only commands (`state`, `subscribe`) are
//! answered at once. Mutating commands (`start`, `submit_note`, `skip`,
//! `advance`) wait until the speech settles and are then applied in arrival
//! order.
//!
//! Events never block the task. Until the first subscriber attaches they are
//! kept in a backlog of at most `event_buffer` events; past that the backlog is
//! discarded and the first subscriber starts from `state.sync`. A subscriber
//! whose buffer fills up is dropped and resynchronizes on reconnect.

use crate::config::DeliberationConfig;
use crate::ports::session_store::SessionStore;
use crate::ports::speech_generator::{SpeechGenerator, SpeechRequest};
use crate::use_cases::speech_streamer::SpeechStreamer;
use jury_domain::{
    DeliberationError, DeliberationEvent, DeliberationPhase, DeliberationSession, JurorId, Note,
    NoteAck, Roster, RoundScheduler, SessionId, SessionSnapshot, SpeakerRole, Speech,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Receiving end of a session's event stream
pub type EventReceiver = mpsc::Receiver<DeliberationEvent>;

type Reply<T> = oneshot::Sender<Result<T, DeliberationError>>;

/// Commands accepted by the controller task
#[derive(Debug)]
pub enum ControllerCommand {
    Start { reply: Reply<SessionSnapshot> },
    SubmitNote { note: Note, reply: Reply<NoteAck> },
    Skip { reply: Reply<SessionSnapshot> },
    /// Close the open note window early
    Advance { reply: Reply<SessionSnapshot> },
    State { reply: oneshot::Sender<SessionSnapshot> },
    /// Attach as the (single) event subscriber, replacing any previous one
    Subscribe { reply: Reply<EventReceiver> },
    Shutdown,
}

impl ControllerCommand {
    /// Whether the command may change session state
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ControllerCommand::Start { .. }
                | ControllerCommand::SubmitNote { .. }
                | ControllerCommand::Skip { .. }
                | ControllerCommand::Advance { .. }
        )
    }
}

/// Cloneable client side of a controller task
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    session_id: SessionId,
    tx: mpsc::UnboundedSender<ControllerCommand>,
}

impl ControllerHandle {
    /// Spawn a controller task for `session_id` and return its handle.
    ///
    /// The task lives until [`ControllerHandle::shutdown`] or until every
    /// handle is dropped.
    pub fn spawn<S, G>(
        session_id: SessionId,
        store: Arc<S>,
        generator: Arc<G>,
        config: DeliberationConfig,
    ) -> Self
    where
        S: SessionStore + 'static,
        G: SpeechGenerator + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller =
            DeliberationController::new(session_id.clone(), store, generator, config, rx);
        tokio::spawn(controller.run());
        Self { session_id, tx }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Whether both handles talk to the same controller task
    pub fn same_controller(&self, other: &ControllerHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ControllerCommand,
    ) -> Result<T, DeliberationError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| DeliberationError::ControllerClosed)?;
        rx.await.map_err(|_| DeliberationError::ControllerClosed)
    }

    pub async fn start(&self) -> Result<SessionSnapshot, DeliberationError> {
        self.request(|reply| ControllerCommand::Start { reply })
            .await?
    }

    pub async fn submit_note(&self, note: Note) -> Result<NoteAck, DeliberationError> {
        self.request(|reply| ControllerCommand::SubmitNote { note, reply })
            .await?
    }

    pub async fn skip(&self) -> Result<SessionSnapshot, DeliberationError> {
        self.request(|reply| ControllerCommand::Skip { reply }).await?
    }

    pub async fn advance(&self) -> Result<SessionSnapshot, DeliberationError> {
        self.request(|reply| ControllerCommand::Advance { reply })
            .await?
    }

    pub async fn state(&self) -> Result<SessionSnapshot, DeliberationError> {
        self.request(|reply| ControllerCommand::State { reply })
            .await
    }

    pub async fn subscribe(&self) -> Result<EventReceiver, DeliberationError> {
        self.request(|reply| ControllerCommand::Subscribe { reply })
            .await?
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(ControllerCommand::Shutdown);
    }
}

/// The actor owning one session's deliberation
pub struct DeliberationController<S: SessionStore + 'static, G: SpeechGenerator + 'static> {
    session_id: SessionId,
    store: Arc<S>,
    generator: Arc<G>,
    config: DeliberationConfig,
    scheduler: RoundScheduler,
    /// `None` while idle
    session: Option<DeliberationSession>,
    commands: mpsc::UnboundedReceiver<ControllerCommand>,
    subscriber: Option<mpsc::Sender<DeliberationEvent>>,
    /// Events emitted before the first subscriber attached
    backlog: VecDeque<DeliberationEvent>,
    /// The backlog outgrew `event_buffer` and was discarded
    overflowed: bool,
    ever_subscribed: bool,
    /// Set when a store write failed; no further events are produced
    aborted: bool,
    advance_requested: bool,
    stopped: bool,
}

impl<S: SessionStore + 'static, G: SpeechGenerator + 'static> DeliberationController<S, G> {
    pub fn new(
        session_id: SessionId,
        store: Arc<S>,
        generator: Arc<G>,
        config: DeliberationConfig,
        commands: mpsc::UnboundedReceiver<ControllerCommand>,
    ) -> Self {
        let scheduler = config.scheduler();
        Self {
            session_id,
            store,
            generator,
            config,
            scheduler,
            session: None,
            commands,
            subscriber: None,
            backlog: VecDeque::new(),
            overflowed: false,
            ever_subscribed: false,
            aborted: false,
            advance_requested: false,
            stopped: false,
        }
    }

    fn phase(&self) -> DeliberationPhase {
        self.session
            .as_ref()
            .map_or(DeliberationPhase::Idle, |s| s.phase())
    }

    fn snapshot(&self) -> SessionSnapshot {
        match &self.session {
            Some(session) => session.snapshot(),
            None => SessionSnapshot::idle(
                self.session_id.clone(),
                self.config.total_rounds,
                self.config.max_notes,
            ),
        }
    }

    /// Run until shut down or until every handle is dropped.
    pub async fn run(mut self) {
        debug!(session = %self.session_id, "Controller started");

        while !self.stopped {
            match self.phase() {
                DeliberationPhase::Starting => self.play_round().await,
                DeliberationPhase::NoteWindow => {
                    if !self.hold_note_window().await {
                        continue;
                    }
                    let more = self.session.as_ref().is_some_and(|s| s.has_more_rounds());
                    if more {
                        self.play_round().await;
                    } else {
                        self.finish();
                    }
                }
                DeliberationPhase::Ended => self.linger().await,
                _ => match self.commands.recv().await {
                    Some(command) => self.handle(command).await,
                    None => self.stopped = true,
                },
            }
        }

        debug!(session = %self.session_id, "Controller stopped");
    }

    async fn handle(&mut self, command: ControllerCommand) {
        match command {
            ControllerCommand::Start { reply } => {
                let result = self.start().await;
                let _ = reply.send(result);
            }
            ControllerCommand::SubmitNote { note, reply } => {
                let result = self.submit_note(note);
                let _ = reply.send(result);
            }
            ControllerCommand::Skip { reply } => {
                let result = self.skip();
                let _ = reply.send(result);
            }
            ControllerCommand::Advance { reply } => {
                let _ = reply.send(self.advance());
            }
            ControllerCommand::State { reply } => {
                let _ = reply.send(self.snapshot());
            }
            ControllerCommand::Subscribe { reply } => {
                let _ = reply.send(self.subscribe());
            }
            ControllerCommand::Shutdown => {
                info!(session = %self.session_id, "Controller shutting down");
                self.stopped = true;
            }
        }
    }

    /// Apply every command already waiting in the inbox.
    async fn drain_inbox(&mut self) {
        while !self.stopped {
            match self.commands.try_recv() {
                Ok(command) => self.handle(command).await,
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => self.stopped = true,
            }
        }
    }

    // ==================== Commands ====================

    async fn start(&mut self) -> Result<SessionSnapshot, DeliberationError> {
        if let Some(session) = &self.session {
            debug!(session = %self.session_id, phase = session.phase().as_str(), "Start ignored, deliberation exists");
            return Ok(session.snapshot());
        }

        let jurors = self.store.roster(&self.session_id).await.map_err(|e| {
            warn!(session = %self.session_id, error = %e, "Cannot load roster");
            DeliberationError::from(e)
        })?;
        let session = DeliberationSession::new(
            self.session_id.clone(),
            Roster::new(jurors),
            self.config.total_rounds,
            self.config.note_policy(),
        )?;
        let total_rounds = session.total_rounds();
        info!(
            session = %self.session_id,
            jurors = session.roster().len(),
            total_rounds,
            "Deliberation started"
        );
        self.session = Some(session);
        self.emit(DeliberationEvent::DebateStart { total_rounds });
        Ok(self.snapshot())
    }

    fn submit_note(&mut self, note: Note) -> Result<NoteAck, DeliberationError> {
        let session = self
            .session
            .as_mut()
            .ok_or(DeliberationError::NotRunning)?;
        let outcome = session.submit_note(note)?;
        if outcome.is_duplicate() {
            debug!(session = %self.session_id, "Duplicate note key, returning recorded acknowledgement");
            return Ok(outcome.into_ack());
        }

        let ack = outcome.into_ack();
        info!(
            session = %self.session_id,
            target = %ack.target_id,
            notes_remaining = ack.notes_remaining,
            "Note accepted"
        );
        self.emit(DeliberationEvent::NoteReceived {
            target_id: ack.target_id.clone(),
            notes_remaining: ack.notes_remaining,
        });
        Ok(ack)
    }

    fn skip(&mut self) -> Result<SessionSnapshot, DeliberationError> {
        match self.phase() {
            DeliberationPhase::Idle => Err(DeliberationError::NotRunning),
            DeliberationPhase::Ended => Ok(self.snapshot()),
            phase => {
                info!(session = %self.session_id, phase = phase.as_str(), "Deliberation skipped");
                self.finish();
                Ok(self.snapshot())
            }
        }
    }

    fn advance(&mut self) -> Result<SessionSnapshot, DeliberationError> {
        match self.phase() {
            DeliberationPhase::Idle => Err(DeliberationError::NotRunning),
            DeliberationPhase::NoteWindow => {
                self.advance_requested = true;
                Ok(self.snapshot())
            }
            _ => Ok(self.snapshot()),
        }
    }

    fn subscribe(&mut self) -> Result<EventReceiver, DeliberationError> {
        if self.session.is_none() {
            return Err(DeliberationError::NotRunning);
        }

        let capacity = self.config.event_buffer.max(self.backlog.len() + 2);
        let (tx, rx) = mpsc::channel(capacity);
        let resync = self.ever_subscribed || self.overflowed;
        self.ever_subscribed = true;

        if resync {
            if self.aborted {
                // Nothing more is emitted after an abort: hand back a closed stream
                debug!(session = %self.session_id, "Deliberation aborted, closing new subscriber");
                return Ok(rx);
            }
            debug!(session = %self.session_id, "Subscriber attached, sending state sync");
            let _ = tx.try_send(DeliberationEvent::StateSync(self.snapshot()));
            if self.phase().is_terminal() {
                let _ = tx.try_send(DeliberationEvent::DebateEnd {});
            }
        } else {
            debug!(session = %self.session_id, backlog = self.backlog.len(), "First subscriber attached");
            for event in self.backlog.drain(..) {
                let _ = tx.try_send(event);
            }
        }

        // An ended or aborted debate closes the stream right after the catch-up events
        self.subscriber = if self.phase().is_terminal() || self.aborted {
            None
        } else {
            Some(tx)
        };
        Ok(rx)
    }

    // ==================== Debate Flow ====================

    async fn play_round(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let round = match session.begin_round(&self.scheduler) {
            Ok(round) => round,
            Err(e) => {
                error!(session = %self.session_id, error = %e, "Cannot schedule round");
                self.finish();
                return;
            }
        };
        info!(
            session = %self.session_id,
            round = round.number(),
            leader = %round.leader(),
            responders = round.responders().len(),
            "Round started"
        );
        self.emit(DeliberationEvent::round_start(&round));

        let speakers: Vec<(JurorId, SpeakerRole)> = round
            .speakers()
            .map(|(id, role)| (id.clone(), role))
            .collect();
        for (speaker, role) in speakers {
            self.drain_inbox().await;
            if self.stopped || self.phase() != DeliberationPhase::RoundActive {
                return;
            }
            self.deliver_speech(speaker, role, round.number()).await;
            if self.stopped || self.phase() != DeliberationPhase::RoundActive {
                return;
            }
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let notes_remaining = session.open_note_window();
        debug!(session = %self.session_id, round = round.number(), notes_remaining, "Note window open");
        self.emit(DeliberationEvent::NoteWindow {
            round: round.number(),
            notes_remaining,
        });
    }

    /// Stream one speech, then apply and persist its stance deltas.
    async fn deliver_speech(&mut self, speaker: JurorId, role: SpeakerRole, round: u32) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let brief = session.brief_for(&speaker, role);
        let request = SpeechRequest::from_brief(self.session_id.as_str(), brief);
        let speech = Speech::new(speaker.clone(), role, round);

        debug!(session = %self.session_id, speaker = %speaker, role = role.as_str(), "Speech requested");
        let mut streamer = match self.generator.generate(request).await {
            Ok(stream) => SpeechStreamer::new(speech, stream),
            Err(e) => SpeechStreamer::failed(speech, e.to_string()),
        };

        let mut deferred = VecDeque::new();
        let mut inbox_open = true;
        loop {
            tokio::select! {
                chunk = streamer.next_chunk() => match chunk {
                    Some(text) => {
                        self.emit(DeliberationEvent::SpeechChunk {
                            speaker_id: speaker.clone(),
                            round,
                            role,
                            text,
                        });
                    }
                    None => break,
                },
                command = self.commands.recv(), if inbox_open => match command {
                    Some(command) if command.is_mutating() => deferred.push_back(command),
                    Some(command) => self.handle(command).await,
                    None => inbox_open = false,
                },
            }
            if self.stopped {
                return;
            }
        }

        self.settle_speech(streamer).await;

        for command in deferred {
            self.handle(command).await;
        }
        if !inbox_open {
            self.stopped = true;
        }
    }

    async fn settle_speech(&mut self, streamer: SpeechStreamer) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let speech = streamer.finish(session.roster());
        let changed = session.apply_speech(&speech);
        let writes: Vec<_> = changed
            .keys()
            .filter_map(|id| session.roster().stance_of(id.as_str()).map(|s| (id.clone(), s)))
            .collect();

        for (juror, stance) in writes {
            if let Err(e) = self
                .store
                .set_stance(&self.session_id, &juror, stance)
                .await
            {
                error!(
                    session = %self.session_id,
                    juror = %juror,
                    error = %e,
                    "Stance write failed, stopping deliberation"
                );
                self.abort();
                return;
            }
        }

        debug!(
            session = %self.session_id,
            speaker = %speech.speaker,
            changed = changed.len(),
            degraded = speech.degraded,
            "Speech settled"
        );
        self.emit(DeliberationEvent::speech_end(&speech));
    }

    /// Hold the note window open until it elapses or is advanced.
    ///
    /// Returns false if the window was left some other way (skip, shutdown).
    async fn hold_note_window(&mut self) -> bool {
        self.advance_requested = false;
        let window = tokio::time::sleep(self.config.note_window);
        tokio::pin!(window);

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => self.stopped = true,
                },
                () = &mut window => break,
            }
            if self.stopped || self.phase() != DeliberationPhase::NoteWindow {
                return false;
            }
            if self.advance_requested {
                debug!(session = %self.session_id, "Note window advanced");
                break;
            }
        }
        self.advance_requested = false;
        true
    }

    /// Keep answering commands for an ended debate until none arrives for
    /// `ended_retention`, then stop.
    async fn linger(&mut self) {
        let retention = tokio::time::sleep(self.config.ended_retention);
        tokio::select! {
            command = self.commands.recv() => match command {
                Some(command) => self.handle(command).await,
                None => self.stopped = true,
            },
            () = retention => {
                info!(session = %self.session_id, "Ended deliberation retired");
                self.stopped = true;
            }
        }
    }

    /// Move to `Ended`, emit `debate.end` and close the stream.
    fn finish(&mut self) {
        let ended = self.session.as_mut().is_some_and(|s| s.end());
        if ended {
            info!(session = %self.session_id, "Deliberation ended");
            self.emit(DeliberationEvent::DebateEnd {});
        }
        self.subscriber = None;
    }

    /// Stop after an unrecoverable failure: no further events, stream dropped.
    fn abort(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.end();
        }
        self.aborted = true;
        self.subscriber = None;
    }

    /// Hand `event` to the subscriber without blocking the controller.
    ///
    /// A subscriber whose buffer is full is dropped; it resynchronizes with
    /// `state.sync` when it reconnects.
    fn emit(&mut self, event: DeliberationEvent) {
        if self.aborted {
            return;
        }
        match &self.subscriber {
            Some(tx) => match tx.try_send(event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        session = %self.session_id,
                        capacity = self.config.event_buffer,
                        "Subscriber is not keeping up, dropping it"
                    );
                    self.subscriber = None;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(session = %self.session_id, "Subscriber gone, continuing without one");
                    self.subscriber = None;
                }
            },
            None if !self.ever_subscribed && !self.overflowed => {
                if self.backlog.len() >= self.config.event_buffer {
                    debug!(session = %self.session_id, "Backlog full, first subscriber will resync");
                    self.backlog.clear();
                    self.overflowed = true;
                } else {
                    self.backlog.push_back(event);
                }
            }
            None => {}
        }
    }
}
