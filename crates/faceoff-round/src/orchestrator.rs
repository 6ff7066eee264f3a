//! The round orchestrator: event handlers and the actor driver.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use faceoff_core::clock::Clock;
use faceoff_core::error::EngineError;
use faceoff_core::rng::RandomSource;
use faceoff_core::store::DurableStore;
use faceoff_core::streaks::WinStreakStore;
use tokio::sync::mpsc;

use crate::config::RoundConfig;
use crate::domain::{
    Announcement, Booster, FeedItem, IdleData, PerSide, Phase, Role, RoundData, RoundPhase,
    Scores, Side, SideSelection, Target, User, UserContribution, Winner,
};
use crate::engine::streaks::WinStreakLedger;
use crate::engine::{booster, contribution, leaderboard, target};
use crate::events::{OutboundPush, RoundChannel, RoundEvent};
use crate::state::{keys, RoundStateStore};
use crate::timer::{
    keys as timer_keys, AnnouncementFollowUp, TimerAction, TimerFire, TimerScheduler,
};

fn millis(ms: u64) -> chrono::Duration {
    chrono::Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

/// Everything a handler needs, passed explicitly instead of living as
/// ambient instance state: collaborators, tuning, the timer registry, and
/// the connected principals.
pub struct RoundRuntime {
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Random source for booster and challenge draws.
    pub rng: Box<dyn RandomSource>,
    /// Phase-gated accessor over the round's durable store.
    pub state: RoundStateStore,
    /// Named-timer registry.
    pub timers: TimerScheduler,
    /// Outbound fan-out.
    pub channel: Arc<dyn RoundChannel>,
    /// Cross-round win-streak ledger.
    pub streaks: WinStreakLedger,
    /// Round tuning.
    pub config: RoundConfig,
    /// The host-side principal, while connected.
    pub host: Option<User>,
    /// The guest-side principal, while connected.
    pub guest: Option<User>,
    /// Display identities of every connected user.
    pub roster: HashMap<String, User>,
}

impl RoundRuntime {
    /// Handles one inbound unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error when a store operation fails; callers log and
    /// continue, since no failure here is user-fatal.
    pub async fn on_event(&mut self, event: RoundEvent) -> Result<(), EngineError> {
        match event {
            RoundEvent::Start => self.on_start().await,
            RoundEvent::Contribution {
                side,
                user_id,
                value,
                label,
            } => self.on_contribution(side, &user_id, value, label).await,
            RoundEvent::Tap { side, user_id } => self.on_tap(side, &user_id).await,
            RoundEvent::Connect { role, user } => self.on_connect(role, user).await,
            RoundEvent::Disconnect { role } => self.on_disconnect(role).await,
            RoundEvent::DeclineInvite { role } => {
                self.on_decline_invite(role).await;
                Ok(())
            }
            RoundEvent::Restart { role } => self.on_restart(role).await,
            RoundEvent::Alarm => self.on_alarm().await,
            RoundEvent::Timer(fire) => self.on_timer_fire(fire).await,
        }
    }

    /// Claims and runs a fired timer. Stale fires are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error when the claimed action's handler fails.
    pub async fn on_timer_fire(&mut self, fire: TimerFire) -> Result<(), EngineError> {
        let Some(action) = self.timers.claim(&fire) else {
            tracing::debug!(key = %fire.key, "stale timer fire discarded");
            return Ok(());
        };
        self.apply_timer_action(action).await
    }

    async fn apply_timer_action(&mut self, action: TimerAction) -> Result<(), EngineError> {
        match action {
            TimerAction::ChallengeIntro => self.begin_challenge_intro().await,
            TimerAction::AnnouncementEnd {
                selection,
                follow_up,
            } => self.end_announcement(selection, follow_up).await,
            TimerAction::TargetEnd => self.resolve_targets().await,
            TimerAction::TargetCleanup { reached } => self.cleanup_targets(reached).await,
            TimerAction::BoosterEnd { selection } => self.expire_boosters(selection).await,
            TimerAction::AntiSnipe => self.override_timer_text().await,
        }
    }

    async fn on_start(&mut self) -> Result<(), EngineError> {
        // A start over a running round supersedes it wholesale.
        self.timers.clear_all();
        self.state.raw().cancel_alarm().await?;

        let win_streaks = self
            .streaks
            .load(
                self.host.as_ref().map(|user| user.id.as_str()),
                self.guest.as_ref().map(|user| user.id.as_str()),
            )
            .await;

        self.state.write_key(keys::SCORES, &Scores::default()).await?;
        self.state
            .write_key(
                keys::USER_CONTRIBUTIONS,
                &PerSide::<Vec<UserContribution>>::default(),
            )
            .await?;

        let feed: Vec<FeedItem> = self.state.read_key(keys::FEED).await?.unwrap_or_default();
        let now = self.clock.now();
        let data = RoundData::new(
            now + millis(self.config.round_duration_ms),
            win_streaks,
            feed,
        );
        self.state.replace(&RoundPhase::Active(data)).await?;

        self.channel
            .broadcast(OutboundPush::SetDoubleTapped(false))
            .await;
        self.sync_state().await?;

        let intro_min = u32::try_from(self.config.challenge_intro_min_ms).unwrap_or(u32::MAX);
        let intro_max = u32::try_from(self.config.challenge_intro_max_ms)
            .unwrap_or(u32::MAX)
            .max(intro_min);
        let intro_delay = u64::from(self.rng.next_u32_range(intro_min, intro_max));
        self.timers.schedule(
            timer_keys::TARGET_DELAY,
            Duration::from_millis(intro_delay),
            TimerAction::ChallengeIntro,
        );
        self.timers.schedule(
            timer_keys::ANTI_SNIPE,
            self.config.round_duration(),
            TimerAction::AntiSnipe,
        );
        self.state.raw().set_alarm(self.config.alarm_delay()).await?;

        tracing::info!(
            round_duration_ms = self.config.round_duration_ms,
            intro_delay_ms = intro_delay,
            "round started"
        );
        Ok(())
    }

    async fn on_contribution(
        &mut self,
        side: Side,
        user_id: &str,
        value: i64,
        label: Option<String>,
    ) -> Result<(), EngineError> {
        let Some(data) = self.state.round(Phase::Active).await? else {
            return Ok(());
        };
        if data.is_finished {
            return Ok(());
        }

        let user = self.display_identity(user_id);
        let active_booster = data.booster.get(side).clone();
        let applied =
            contribution::apply(&self.state, &user, side, value, active_booster.as_ref()).await?;
        self.channel
            .broadcast(OutboundPush::UpdateScores(applied.scores))
            .await;

        let body = match label {
            Some(label) => format!("sent a {label}"),
            None => format!("contributed {} points", applied.effective_value),
        };
        self.append_feed(FeedItem::user(user.username.clone(), body, self.clock.now()))
            .await?;

        if data.target.host.is_some() || data.target.guest.is_some() {
            self.progress_target(side, &user, applied.effective_value)
                .await?;
        }
        self.finish_scoring(applied.scores).await
    }

    async fn on_tap(&mut self, side: Side, user_id: &str) -> Result<(), EngineError> {
        let Some(data) = self.state.round(Phase::Active).await? else {
            return Ok(());
        };
        if data.is_finished {
            return Ok(());
        }

        let mut tapped: Vec<String> = self
            .state
            .read_key(keys::USERS_DOUBLE_TAPPED)
            .await?
            .unwrap_or_default();
        if tapped.iter().any(|id| id == user_id) {
            return Ok(());
        }
        tapped.push(user_id.to_owned());
        self.state.write_key(keys::USERS_DOUBLE_TAPPED, &tapped).await?;
        self.channel
            .send_to_user(user_id, OutboundPush::SetDoubleTapped(true))
            .await;

        let user = self.display_identity(user_id);
        let active_booster = data.booster.get(side).clone();
        let applied = contribution::apply(
            &self.state,
            &user,
            side,
            self.config.double_tap_value,
            active_booster.as_ref(),
        )
        .await?;
        self.channel
            .broadcast(OutboundPush::UpdateScores(applied.scores))
            .await;

        if data.target.host.is_some() || data.target.guest.is_some() {
            self.progress_target(side, &user, applied.effective_value)
                .await?;
        }
        self.finish_scoring(applied.scores).await
    }

    async fn on_connect(&mut self, role: Role, user: User) -> Result<(), EngineError> {
        self.roster.insert(user.id.clone(), user.clone());
        match role {
            Role::Streamer => self.host = Some(user.clone()),
            Role::Guest => self.guest = Some(user.clone()),
            Role::Viewer => {}
        }

        match self.state.phase().await? {
            None => {
                self.state
                    .replace(&RoundPhase::Idle(IdleData::default()))
                    .await?;
            }
            Some(stored) => {
                self.channel
                    .send_to_user(&user.id, OutboundPush::SetState(stored))
                    .await;
            }
        }

        let tapped: Vec<String> = self
            .state
            .read_key(keys::USERS_DOUBLE_TAPPED)
            .await?
            .unwrap_or_default();
        if tapped.contains(&user.id) {
            self.channel
                .send_to_user(&user.id, OutboundPush::SetDoubleTapped(true))
                .await;
        }
        Ok(())
    }

    async fn on_disconnect(&mut self, role: Role) -> Result<(), EngineError> {
        let Some(side) = role.principal_side() else {
            return Ok(());
        };
        self.forfeit(side).await?;

        if role == Role::Streamer {
            self.append_feed(FeedItem::system("streamer left the game!", self.clock.now()))
                .await?;
            self.sync_state().await?;
        }
        match role {
            Role::Streamer => self.host = None,
            Role::Guest => self.guest = None,
            Role::Viewer => {}
        }
        Ok(())
    }

    async fn on_decline_invite(&mut self, role: Role) {
        if role == Role::Guest {
            self.channel
                .send_to_role(Role::Streamer, OutboundPush::InviteDeclined)
                .await;
        }
    }

    async fn on_restart(&mut self, role: Role) -> Result<(), EngineError> {
        if role == Role::Viewer {
            return Ok(());
        }
        let from_guest = role == Role::Guest;
        self.reset_round().await;

        self.channel
            .broadcast(OutboundPush::SetState(RoundPhase::Idle(IdleData::default())))
            .await;
        // The initiator's opponent receives the rematch invitation.
        let (invite_role, title) = if from_guest {
            (Role::Streamer, "Your opponent wants a rematch")
        } else {
            (Role::Guest, "You have been invited to the rematch")
        };
        let invited = IdleData {
            invited: false,
            is_co_host_invite: false,
            title: Some(title.to_owned()),
        };
        self.channel
            .send_to_role(invite_role, OutboundPush::SetState(RoundPhase::Idle(invited)))
            .await;

        tracing::info!(from_guest, "round reset for rematch");
        Ok(())
    }

    /// Concludes the round when the store alarm fires.
    ///
    /// # Errors
    ///
    /// Returns an error when a store operation fails.
    pub async fn on_alarm(&mut self) -> Result<(), EngineError> {
        let Some(data) = self.state.round(Phase::Active).await? else {
            return Ok(());
        };
        let scores: Scores = self.state.read_key(keys::SCORES).await?.unwrap_or_default();
        let winner = match scores.host.cmp(&scores.guest) {
            Ordering::Greater => Winner::Host,
            Ordering::Less => Winner::Guest,
            Ordering::Equal => Winner::Draw,
        };

        if winner == Winner::Draw && !data.extra_time_granted {
            if let Some(extra_ms) = self.config.extra_time_ms {
                return self.grant_extra_time(extra_ms).await;
            }
        }

        match winner {
            Winner::Host => {
                if let (Some(host), Some(guest)) = (&self.host, &self.guest) {
                    self.streaks
                        .record(&host.id, data.win_streaks.host, &guest.id)
                        .await;
                }
            }
            Winner::Guest => {
                if let (Some(host), Some(guest)) = (&self.host, &self.guest) {
                    self.streaks
                        .record(&guest.id, data.win_streaks.guest, &host.id)
                        .await;
                }
            }
            Winner::Draw => {}
        }

        self.conclude(winner, scores).await
    }

    async fn grant_extra_time(&mut self, extra_ms: u64) -> Result<(), EngineError> {
        let now = self.clock.now();
        let updated = self
            .state
            .update(Phase::Active, |data| {
                data.extra_time_granted = true;
                data.ends_at = now + millis(extra_ms);
                data.timer_text_override = None;
            })
            .await?;
        if updated.is_none() {
            return Ok(());
        }

        self.append_feed(FeedItem::system("scores are level, extra time!", now))
            .await?;
        let announcement = Announcement::new("extra time", self.config.announcement_ms);
        self.show_announcement(SideSelection::Both, &announcement, AnnouncementFollowUp::None)
            .await?;
        self.timers.schedule(
            timer_keys::ANTI_SNIPE,
            Duration::from_millis(extra_ms),
            TimerAction::AntiSnipe,
        );
        self.state
            .raw()
            .set_alarm(Duration::from_millis(extra_ms + self.config.alarm_grace_ms))
            .await?;
        self.sync_state().await?;

        tracing::info!(extra_ms, "round drawn, extra time granted");
        Ok(())
    }

    async fn conclude(&mut self, winner: Winner, scores: Scores) -> Result<(), EngineError> {
        let Some(mut data) = self.state.round(Phase::Active).await? else {
            return Ok(());
        };
        let now = self.clock.now();
        data.scores = scores;
        data.winner = Some(winner);
        data.is_finished = true;
        data.timer_text_override = None;
        data.target = PerSide::default();
        data.booster = PerSide::default();
        data.announcement = PerSide::default();
        data.ends_at = now + millis(self.config.victory_lap_ms);
        data.win_streaks = self
            .streaks
            .load(
                self.host.as_ref().map(|user| user.id.as_str()),
                self.guest.as_ref().map(|user| user.id.as_str()),
            )
            .await;
        self.state.replace(&RoundPhase::Concluded(data)).await?;

        let entry = match winner {
            Winner::Draw => FeedItem::system("it's a draw!", now),
            Winner::Host => FeedItem::user(self.principal_name(Side::Host), "won this round!", now),
            Winner::Guest => {
                FeedItem::user(self.principal_name(Side::Guest), "won this round!", now)
            }
        };
        self.append_feed(entry).await?;
        self.sync_state().await?;

        tracing::info!(?winner, "round concluded");
        Ok(())
    }

    async fn forfeit(&mut self, departing: Side) -> Result<(), EngineError> {
        let now = self.clock.now();
        let departing_user = match departing {
            Side::Host => self.host.clone(),
            Side::Guest => self.guest.clone(),
        };
        if let Some(user) = &departing_user {
            self.append_feed(FeedItem::user(user.username.clone(), "left the game!", now))
                .await?;
        }

        let Some(data) = self.state.round(Phase::Active).await? else {
            return Ok(());
        };
        if data.ends_at <= now {
            // The round clock already ran out; conclusion belongs to the
            // alarm.
            return Ok(());
        }

        self.state.raw().cancel_alarm().await?;
        self.timers.clear_all();

        let winner_side = departing.opponent();
        if let Some(user) = &departing_user {
            self.streaks.reset(&user.id).await;
        }
        let win_streaks = self
            .streaks
            .load(
                self.host.as_ref().map(|user| user.id.as_str()),
                self.guest.as_ref().map(|user| user.id.as_str()),
            )
            .await;
        let scores: Scores = self.state.read_key(keys::SCORES).await?.unwrap_or_default();

        let mut concluded = data;
        concluded.scores = scores;
        concluded.winner = Some(Winner::from(winner_side));
        concluded.is_finished = true;
        concluded.is_forfeited = true;
        concluded.timer_text_override = None;
        concluded.target = PerSide::default();
        concluded.booster = PerSide::default();
        concluded.win_streaks = win_streaks;
        concluded.ends_at = now + millis(self.config.victory_lap_ms);
        concluded.announcement = PerSide::default();
        *concluded.announcement.get_mut(winner_side) = Some(Announcement::new(
            "opponent forfeited",
            self.config.announcement_ms,
        ));
        self.state.replace(&RoundPhase::Concluded(concluded)).await?;

        self.append_feed(FeedItem::user(
            self.principal_name(winner_side),
            format!("won this round, {departing} left the game!"),
            now,
        ))
        .await?;
        self.sync_state().await?;

        tracing::info!(%departing, "round forfeited");
        Ok(())
    }

    async fn begin_challenge_intro(&mut self) -> Result<(), EngineError> {
        let announcement = Announcement::new("speed challenge", self.config.announcement_ms)
            .with_trailing("30s");
        self.show_announcement(
            SideSelection::Both,
            &announcement,
            AnnouncementFollowUp::IntroduceEffect,
        )
        .await
    }

    async fn end_announcement(
        &mut self,
        selection: SideSelection,
        follow_up: AnnouncementFollowUp,
    ) -> Result<(), EngineError> {
        let updated = self
            .state
            .update(Phase::Active, |data| {
                for side in selection.sides() {
                    *data.announcement.get_mut(side) = None;
                }
            })
            .await?;
        if updated.is_none() {
            // The round moved on while the announcement was up; the
            // follow-up chain dies with it.
            return Ok(());
        }
        self.sync_state().await?;

        match follow_up {
            AnnouncementFollowUp::None => Ok(()),
            AnnouncementFollowUp::IntroduceEffect => {
                let announcement = Announcement::new(
                    "reaching the target will 2x team points",
                    self.config.announcement_ms,
                );
                self.show_announcement(
                    SideSelection::Both,
                    &announcement,
                    AnnouncementFollowUp::SpawnTarget,
                )
                .await
            }
            AnnouncementFollowUp::SpawnTarget => self.spawn_challenge().await,
        }
    }

    async fn spawn_challenge(&mut self) -> Result<(), EngineError> {
        if self.state.round(Phase::Active).await?.is_none() {
            return Ok(());
        }
        let drawn = target::draw_challenge(self.rng.as_mut(), self.roster.len(), &self.config);
        let granted = booster::draw(
            self.rng.as_mut(),
            self.clock.as_ref(),
            self.config.booster_duration_ms,
        );
        let now = self.clock.now();
        let challenge = Target {
            title: drawn.title,
            kind: drawn.kind,
            current_value: 0,
            target_value: drawn.target_value,
            ends_at: now + millis(drawn.window_ms),
            booster: granted,
        };
        self.create_target(challenge, SideSelection::Both).await
    }

    pub(crate) async fn create_target(
        &mut self,
        challenge: Target,
        selection: SideSelection,
    ) -> Result<(), EngineError> {
        let Some(data) = self.state.round(Phase::Active).await? else {
            return Ok(());
        };

        // Baselines for the boost-summary arithmetic, and a clean slate
        // for markers and contributor sets from any earlier challenge.
        for side in [Side::Host, Side::Guest] {
            self.state
                .write_key(&keys::score_baseline(side), data.scores.get(side))
                .await?;
            self.state.remove_key(&keys::reached_target(side)).await?;
            self.state
                .remove_key(&keys::target_contributors(side))
                .await?;
        }

        tracing::info!(
            title = %challenge.title,
            goal = challenge.target_value,
            ?selection,
            "target created"
        );

        let ends_at = challenge.ends_at;
        let updated = self
            .state
            .update(Phase::Active, |data| {
                for side in selection.sides() {
                    *data.target.get_mut(side) = Some(challenge.clone());
                }
            })
            .await?;
        if updated.is_none() {
            return Ok(());
        }
        self.sync_state().await?;

        let now = self.clock.now();
        let until_resolution = (ends_at - now).to_std().unwrap_or_default()
            + Duration::from_millis(self.config.target_end_grace_ms);
        self.timers
            .schedule(timer_keys::TARGET_END, until_resolution, TimerAction::TargetEnd);
        Ok(())
    }

    async fn progress_target(
        &mut self,
        side: Side,
        user: &User,
        effective_value: i64,
    ) -> Result<(), EngineError> {
        let Some(data) = self.state.round(Phase::Active).await? else {
            return Ok(());
        };
        let Some(mut live) = data.target.get(side).clone() else {
            return Ok(());
        };

        let counted = target::advance(&self.state, &mut live, side, &user.id, effective_value)
            .await?;
        if !counted {
            return Ok(());
        }

        if live.is_reached() {
            self.state
                .write_key(&keys::reached_target(side), &live)
                .await?;
            let opponent_reached: Option<Target> = self
                .state
                .read_key(&keys::reached_target(side.opponent()))
                .await?;
            if opponent_reached.is_some() {
                // Both sides finished before the deadline: resolve
                // together now instead of waiting it out.
                if let Some(action) = self.timers.invoke_early(timer_keys::TARGET_END) {
                    self.apply_timer_action(action).await?;
                }
            } else {
                let updated = self
                    .state
                    .update(Phase::Active, |data| {
                        *data.target.get_mut(side) = None;
                    })
                    .await?;
                if updated.is_some() {
                    let announcement =
                        Announcement::new("target reached", self.config.reached_announcement_ms)
                            .with_background("#ffff4e6a");
                    self.show_announcement(
                        SideSelection::One(side),
                        &announcement,
                        AnnouncementFollowUp::None,
                    )
                    .await?;
                }
            }
        } else {
            self.state
                .update(Phase::Active, |data| {
                    *data.target.get_mut(side) = Some(live);
                })
                .await?;
        }
        Ok(())
    }

    async fn resolve_targets(&mut self) -> Result<(), EngineError> {
        let host_marker: Option<Target> = self
            .state
            .read_key(&keys::reached_target(Side::Host))
            .await?;
        let guest_marker: Option<Target> = self
            .state
            .read_key(&keys::reached_target(Side::Guest))
            .await?;

        // Consume the markers before acting on them: resolution is driven
        // by their presence at this single instant, never by event
        // arrival order, and a stray duplicate firing must find nothing.
        for side in [Side::Host, Side::Guest] {
            self.state.remove_key(&keys::reached_target(side)).await?;
            self.state
                .remove_key(&keys::target_contributors(side))
                .await?;
        }

        let Some(data) = self.state.round(Phase::Active).await? else {
            return Ok(());
        };
        let has_live_target = data.target.host.is_some() || data.target.guest.is_some();
        if host_marker.is_none() && guest_marker.is_none() && !has_live_target {
            return Ok(());
        }

        let host_reached = host_marker.as_ref().is_some_and(Target::is_reached);
        let guest_reached = guest_marker.as_ref().is_some_and(Target::is_reached);

        let boosters = PerSide {
            host: host_marker.filter(|_| host_reached).map(|t| t.booster),
            guest: guest_marker.filter(|_| guest_reached).map(|t| t.booster),
        };
        if boosters.host.is_some() || boosters.guest.is_some() {
            self.activate_boosters(boosters).await?;
        }

        self.timers.schedule(
            timer_keys::TARGET_UPDATE_DELAY,
            Duration::from_millis(self.config.target_cleanup_delay_ms),
            TimerAction::TargetCleanup {
                reached: PerSide {
                    host: host_reached,
                    guest: guest_reached,
                },
            },
        );
        tracing::info!(host_reached, guest_reached, "targets resolved");
        Ok(())
    }

    pub(crate) async fn activate_boosters(
        &mut self,
        boosters: PerSide<Option<Booster>>,
    ) -> Result<(), EngineError> {
        let selection = match (&boosters.host, &boosters.guest) {
            (Some(_), Some(_)) => SideSelection::Both,
            (Some(_), None) => SideSelection::One(Side::Host),
            (None, Some(_)) => SideSelection::One(Side::Guest),
            (None, None) => return Ok(()),
        };
        let now = self.clock.now();
        let boosters = boosters.map(|slot| {
            slot.map(|mut booster| {
                booster.ends_at = now + millis(booster.duration_ms);
                booster
            })
        });
        let duration_ms = boosters
            .host
            .as_ref()
            .or(boosters.guest.as_ref())
            .map_or(0, |booster| booster.duration_ms);

        let updated = self
            .state
            .update(Phase::Active, |data| {
                for side in selection.sides() {
                    // Activating a booster clears that side's
                    // announcement in the same step.
                    *data.announcement.get_mut(side) = None;
                    *data.booster.get_mut(side) = boosters.get(side).clone();
                }
            })
            .await?;
        let Some(updated) = updated else {
            return Ok(());
        };
        self.channel
            .broadcast(OutboundPush::UpdateBooster(updated.booster.clone()))
            .await;
        self.sync_state().await?;

        if selection == SideSelection::Both {
            // One live booster per side: the shared expiry supersedes any
            // single-side expiry still pending.
            self.timers
                .cancel(&timer_keys::booster_end(SideSelection::One(Side::Host)));
            self.timers
                .cancel(&timer_keys::booster_end(SideSelection::One(Side::Guest)));
        }
        self.timers.schedule(
            &timer_keys::booster_end(selection),
            Duration::from_millis(duration_ms),
            TimerAction::BoosterEnd { selection },
        );
        Ok(())
    }

    async fn expire_boosters(&mut self, selection: SideSelection) -> Result<(), EngineError> {
        let scores: Scores = self.state.read_key(keys::SCORES).await?.unwrap_or_default();
        let updated = self
            .state
            .update(Phase::Active, |data| {
                for side in selection.sides() {
                    *data.booster.get_mut(side) = None;
                    *data.announcement.get_mut(side) = None;
                }
                data.target = PerSide::default();
            })
            .await?;
        let Some(updated) = updated else {
            return Ok(());
        };
        self.channel
            .broadcast(OutboundPush::UpdateBooster(updated.booster.clone()))
            .await;

        for side in selection.sides() {
            let baseline: i64 = self
                .state
                .read_key(&keys::score_baseline(side))
                .await?
                .unwrap_or(*scores.get(side));
            let earned = *scores.get(side) - baseline;
            let announcement =
                Announcement::new("total match points: ", self.config.boost_summary_ms)
                    .with_trailing(earned.to_string());
            self.show_announcement(
                SideSelection::One(side),
                &announcement,
                AnnouncementFollowUp::None,
            )
            .await?;
        }
        Ok(())
    }

    async fn cleanup_targets(&mut self, reached: PerSide<bool>) -> Result<(), EngineError> {
        let updated = self
            .state
            .update(Phase::Active, |data| {
                data.target = PerSide::default();
                for side in [Side::Host, Side::Guest] {
                    if *reached.get(side) {
                        *data.announcement.get_mut(side) = None;
                    }
                }
            })
            .await?;
        let Some(updated) = updated else {
            return Ok(());
        };
        self.sync_state().await?;

        for side in [Side::Host, Side::Guest] {
            // A side with a live booster trivially reached its target; it
            // must never see a "not reached" banner from a stray rerun.
            if !*reached.get(side) && updated.booster.get(side).is_none() {
                let announcement =
                    Announcement::new("target not reached", self.config.announcement_ms);
                self.show_announcement(
                    SideSelection::One(side),
                    &announcement,
                    AnnouncementFollowUp::None,
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn override_timer_text(&mut self) -> Result<(), EngineError> {
        let updated = self
            .state
            .update(Phase::Active, |data| {
                data.timer_text_override = Some("time is up!".to_owned());
            })
            .await?;
        if updated.is_some() {
            self.sync_state().await?;
        }
        Ok(())
    }

    async fn show_announcement(
        &mut self,
        selection: SideSelection,
        announcement: &Announcement,
        follow_up: AnnouncementFollowUp,
    ) -> Result<(), EngineError> {
        let updated = self
            .state
            .update(Phase::Active, |data| {
                for side in selection.sides() {
                    *data.announcement.get_mut(side) = Some(announcement.clone());
                }
            })
            .await?;
        let Some(updated) = updated else {
            return Ok(());
        };
        self.channel
            .broadcast(OutboundPush::AnnounceTarget(updated.announcement.clone()))
            .await;
        self.sync_state().await?;
        self.timers.schedule(
            &timer_keys::announcement_end(selection),
            Duration::from_millis(announcement.duration_ms),
            TimerAction::AnnouncementEnd {
                selection,
                follow_up,
            },
        );
        Ok(())
    }

    async fn finish_scoring(&mut self, scores: Scores) -> Result<(), EngineError> {
        let contributions: PerSide<Vec<UserContribution>> = self
            .state
            .read_key(keys::USER_CONTRIBUTIONS)
            .await?
            .unwrap_or_default();
        let ranked = leaderboard::rank_sides(&contributions);
        self.channel
            .broadcast(OutboundPush::UpdateLeaderboard(ranked.clone()))
            .await;
        let updated = self
            .state
            .update(Phase::Active, |data| {
                data.scores = scores;
                data.leaderboard = ranked;
            })
            .await?;
        if updated.is_some() {
            self.sync_state().await?;
        }
        Ok(())
    }

    pub(crate) async fn append_feed(&mut self, item: FeedItem) -> Result<(), EngineError> {
        let mut feed: Vec<FeedItem> = self.state.read_key(keys::FEED).await?.unwrap_or_default();
        feed.push(item);
        self.state.write_key(keys::FEED, &feed).await?;
        self.state.update_round(|data| data.feed = feed).await?;
        Ok(())
    }

    async fn reset_round(&mut self) {
        self.timers.clear_all();
        if let Err(error) = self.try_reset().await {
            tracing::warn!(%error, "round reset failed");
            // A failed reset must not leave the match unresponsive.
            let _ = self
                .append_feed(FeedItem::system(
                    format!("reset failed: {error}"),
                    self.clock.now(),
                ))
                .await;
        }
    }

    async fn try_reset(&self) -> Result<(), EngineError> {
        self.state.raw().cancel_alarm().await?;
        self.state.raw().clear().await?;
        self.state
            .replace(&RoundPhase::Idle(IdleData::default()))
            .await
    }

    async fn sync_state(&self) -> Result<(), EngineError> {
        if let Some(stored) = self.state.phase().await? {
            self.channel.broadcast(OutboundPush::SetState(stored)).await;
        }
        Ok(())
    }

    fn display_identity(&self, user_id: &str) -> User {
        self.roster
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| User::unknown(user_id))
    }

    fn principal_name(&self, side: Side) -> String {
        let principal = match side {
            Side::Host => self.host.as_ref(),
            Side::Guest => self.guest.as_ref(),
        };
        principal.map_or_else(|| side.to_string(), |user| user.username.clone())
    }
}

/// One round's single-actor driver: owns the runtime and the timer queue,
/// and processes units of work strictly one at a time.
pub struct RoundOrchestrator {
    runtime: RoundRuntime,
    timer_rx: mpsc::UnboundedReceiver<TimerFire>,
}

impl RoundOrchestrator {
    /// Wires an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn DurableStore>,
        streak_store: Arc<dyn WinStreakStore>,
        channel: Arc<dyn RoundChannel>,
        clock: Arc<dyn Clock>,
        rng: Box<dyn RandomSource>,
        config: RoundConfig,
    ) -> Self {
        let (timers, timer_rx) = TimerScheduler::new();
        Self {
            runtime: RoundRuntime {
                clock,
                rng,
                state: RoundStateStore::new(store),
                timers,
                channel,
                streaks: WinStreakLedger::new(streak_store),
                config,
                host: None,
                guest: None,
                roster: HashMap::new(),
            },
            timer_rx,
        }
    }

    /// The runtime context, for hosting layers that drive events
    /// themselves instead of using [`run`](Self::run).
    pub fn runtime(&mut self) -> &mut RoundRuntime {
        &mut self.runtime
    }

    /// Handles one event, logging instead of propagating failures.
    pub async fn dispatch(&mut self, event: RoundEvent) {
        if let Err(error) = self.runtime.on_event(event).await {
            tracing::warn!(%error, "event handling failed");
        }
    }

    /// Drains and handles every timer fire queued so far.
    pub async fn process_due_timers(&mut self) {
        while let Ok(fire) = self.timer_rx.try_recv() {
            if let Err(error) = self.runtime.on_event(RoundEvent::Timer(fire)).await {
                tracing::warn!(%error, "timer handling failed");
            }
        }
    }

    /// Runs the actor loop until the inbound channel closes.
    pub async fn run(self, mut inbound: mpsc::UnboundedReceiver<RoundEvent>) {
        let Self {
            mut runtime,
            mut timer_rx,
        } = self;
        loop {
            tokio::select! {
                event = inbound.recv() => {
                    let Some(event) = event else { break };
                    if let Err(error) = runtime.on_event(event).await {
                        tracing::warn!(%error, "event handling failed");
                    }
                }
                fire = timer_rx.recv() => {
                    if let Some(fire) = fire {
                        if let Err(error) = runtime.on_event(RoundEvent::Timer(fire)).await {
                            tracing::warn!(%error, "timer handling failed");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use faceoff_test_support::{FixedClock, MemoryStore, MemoryWinStreaks, MockRandom};

    use super::RoundOrchestrator;
    use crate::config::RoundConfig;
    use crate::domain::{
        Announcement, Booster, BoosterKind, PerSide, Phase, Role, Side, SideSelection, Target,
        TargetKind, User,
    };
    use crate::events::{OutboundPush, RoundChannel, RoundEvent};
    use crate::timer::{AnnouncementFollowUp, TimerAction};

    // A local stand-in for `faceoff_test_support::RecordingChannel`: using
    // the test-support crate's copy here would pull in a second compiled
    // instance of this crate's own types (the unit-test build links
    // against the lib under test, while `faceoff-test-support` links
    // against a separately compiled copy), which the compiler treats as
    // distinct types. Mirrors that implementation exactly.
    #[derive(Debug, Default)]
    struct RecordingChannel {
        pushes: Mutex<Vec<OutboundPush>>,
    }

    impl RecordingChannel {
        fn new() -> Self {
            Self::default()
        }

        fn broadcasts(&self) -> Vec<OutboundPush> {
            self.pushes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RoundChannel for RecordingChannel {
        async fn broadcast(&self, push: OutboundPush) {
            self.pushes.lock().unwrap().push(push);
        }

        async fn send_to_role(&self, _role: Role, _push: OutboundPush) {}

        async fn send_to_user(&self, _user_id: &str, _push: OutboundPush) {}
    }

    fn test_config() -> RoundConfig {
        RoundConfig {
            challenge_intro_min_ms: 1_000,
            challenge_intro_max_ms: 1_000,
            score_challenge_floor: 10,
            ..RoundConfig::default()
        }
    }

    struct Harness {
        orchestrator: RoundOrchestrator,
        store: Arc<MemoryStore>,
        channel: Arc<RecordingChannel>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let channel = Arc::new(RecordingChannel::new());
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        let orchestrator = RoundOrchestrator::new(
            Arc::clone(&store) as _,
            Arc::new(MemoryWinStreaks::new()),
            Arc::clone(&channel) as _,
            Arc::new(clock),
            Box::new(MockRandom),
            test_config(),
        );
        Harness {
            orchestrator,
            store,
            channel,
        }
    }

    async fn start_round(harness: &mut Harness) {
        harness
            .orchestrator
            .dispatch(RoundEvent::Connect {
                role: Role::Streamer,
                user: User::new("host-user", "hosty"),
            })
            .await;
        harness
            .orchestrator
            .dispatch(RoundEvent::Connect {
                role: Role::Guest,
                user: User::new("guest-user", "guesty"),
            })
            .await;
        harness.orchestrator.dispatch(RoundEvent::Start).await;
    }

    fn small_target(clock_base: chrono::DateTime<Utc>, target_value: i64) -> Target {
        Target {
            title: "speed challenge".to_owned(),
            kind: TargetKind::CumulativeScore,
            current_value: 0,
            target_value,
            ends_at: clock_base + chrono::Duration::seconds(15),
            booster: Booster {
                title: "x2 value".to_owned(),
                kind: BoosterKind::Double,
                ends_at: clock_base + chrono::Duration::seconds(45),
                duration_ms: 30_000,
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_target_resolution_does_not_double_activate() {
        // Arrange: an active round where only the host reaches the target.
        let mut harness = harness();
        start_round(&mut harness).await;
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let runtime = harness.orchestrator.runtime();
        runtime
            .create_target(small_target(base, 10), SideSelection::Both)
            .await
            .unwrap();
        runtime
            .on_event(RoundEvent::Contribution {
                side: Side::Host,
                user_id: "host-user".to_owned(),
                value: 10,
                label: None,
            })
            .await
            .unwrap();

        // Act: the deadline resolution runs, then a stray duplicate.
        runtime
            .apply_timer_action(TimerAction::TargetEnd)
            .await
            .unwrap();
        let feed_len_after_first = runtime
            .state
            .round(Phase::Active)
            .await
            .unwrap()
            .unwrap()
            .feed
            .len();
        runtime
            .apply_timer_action(TimerAction::TargetEnd)
            .await
            .unwrap();

        // Assert: one booster activation, no extra feed entries.
        let data = runtime.state.round(Phase::Active).await.unwrap().unwrap();
        assert_eq!(
            data.booster.host.as_ref().map(|b| b.kind),
            Some(BoosterKind::Double)
        );
        assert!(data.booster.guest.is_none());
        assert_eq!(data.feed.len(), feed_len_after_first);
        let booster_updates = harness
            .channel
            .broadcasts()
            .into_iter()
            .filter(|push| matches!(push, OutboundPush::UpdateBooster(_)))
            .count();
        assert_eq!(booster_updates, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_booster_activation_clears_the_sides_announcement() {
        // Arrange
        let mut harness = harness();
        start_round(&mut harness).await;
        let runtime = harness.orchestrator.runtime();
        runtime
            .show_announcement(
                SideSelection::One(Side::Host),
                &Announcement::new("target reached", 30_000),
                AnnouncementFollowUp::None,
            )
            .await
            .unwrap();

        // Act
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        runtime
            .activate_boosters(PerSide {
                host: Some(small_target(base, 10).booster),
                guest: None,
            })
            .await
            .unwrap();

        // Assert
        let data = runtime.state.round(Phase::Active).await.unwrap().unwrap();
        assert!(data.announcement.host.is_none());
        assert!(data.booster.host.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_contribution_after_conclusion_is_dropped() {
        // Arrange
        let mut harness = harness();
        start_round(&mut harness).await;
        harness.orchestrator.dispatch(RoundEvent::Alarm).await;
        // The all-zero alarm outcome is a draw; a second alarm after the
        // extra-time window concludes it.
        harness.orchestrator.dispatch(RoundEvent::Alarm).await;
        assert!(harness.store.value("state").is_some());

        // Act
        harness
            .orchestrator
            .dispatch(RoundEvent::Contribution {
                side: Side::Host,
                user_id: "host-user".to_owned(),
                value: 50,
                label: None,
            })
            .await;

        // Assert: the concluded snapshot's scores are untouched.
        let runtime = harness.orchestrator.runtime();
        let data = runtime
            .state
            .round(Phase::Concluded)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(data.scores.host, 0);
        assert!(data.is_finished);
    }
}
