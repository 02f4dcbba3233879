//! Inline button handlers.

use std::collections::HashSet;

use super::QuizBot;
use crate::error::BotError;
use crate::error::CallbackDataError;
use crate::format::escape_html;
use crate::format::head_and_tail;
use crate::format::score_table;
use crate::keyboards;
use crate::keyboards::CallbackAction;
use crate::store::GameStatus;
use crate::telegram::CallbackQuery;
use crate::telegram::User;

const NOT_ALLOWED: &str = "Недостаточно прав.";
const NO_ACTIVE_GAME: &str = "Нет активной игры.";

/// Where the pressed button lives.
#[derive(Debug, Clone, Copy)]
struct Origin {
    chat_id: i64,
    message_id: i64,
}

/// One callback query, with the answer still owed to Telegram.
struct Press<'a> {
    id: &'a str,
    user: &'a User,
    origin: Option<Origin>,
}

impl QuizBot {
    /// Handles a callback query.
    pub async fn handle_callback(&self, query: CallbackQuery) -> Result<(), BotError> {
        let press = Press {
            id: &query.id,
            user: &query.from,
            origin: query.message.as_ref().map(|m| Origin {
                chat_id: m.chat.id,
                message_id: m.message_id,
            }),
        };
        let data = query.data.as_deref().unwrap_or_default();

        let action = match CallbackAction::parse(data) {
            Ok(action) => action,
            Err(CallbackDataError::MalformedTeamId(raw)) => {
                log::warn!("Malformed callback data from {}: {}", press.user.id, raw);
                let text = if self.is_admin(press.user.id) {
                    "Некорректные данные."
                } else {
                    NOT_ALLOWED
                };
                return self.answer(&press, text, true).await;
            }
            Err(err @ CallbackDataError::Unknown(_)) => {
                log::debug!("{}", err);
                return self.answer(&press, "", false).await;
            }
        };

        if action.requires_admin() && !self.is_admin(press.user.id) {
            return self.answer(&press, NOT_ALLOWED, true).await;
        }

        log::debug!("Callback {} from {}", action, press.user.id);
        match action {
            CallbackAction::PlayerRegister => self.on_player_register(&press).await,
            CallbackAction::PlayerBuzzer => self.on_player_buzzer(&press).await,
            CallbackAction::AdminStartGame => self.on_admin_start_game(&press).await,
            CallbackAction::AdminStartQuestion => self.on_admin_start_question(&press).await,
            CallbackAction::AdminFinishGame => self.on_admin_finish_game(&press).await,
            CallbackAction::AdminShowScores => self.on_admin_show_scores(&press).await,
            CallbackAction::AdminCorrect(team_id) => self.on_admin_correct(&press, team_id).await,
            CallbackAction::AdminWrong => self.on_admin_wrong(&press).await,
        }
    }

    // =========================================================================
    // Player buttons
    // =========================================================================

    async fn on_player_register(&self, press: &Press<'_>) -> Result<(), BotError> {
        self.pending.request(press.user.id);
        if let Some(origin) = press.origin {
            self.messenger
                .send_message(origin.chat_id, "Введи название команды одним сообщением 👇", None)
                .await?;
        }
        self.answer(press, "Жду название команды", false).await
    }

    async fn on_player_buzzer(&self, press: &Press<'_>) -> Result<(), BotError> {
        let Some(game) = self.store().active_game().await? else {
            return self
                .answer(press, "❗ Сейчас нет активной игры. Подожди сигнал ведущего.", true)
                .await;
        };

        let player = self.refresh_player(press.user).await?;
        let outcome = self.game.press_buzzer(&game, &player).await?;
        self.answer(press, &outcome.message(), false).await?;

        if let (true, Some(team)) = (outcome.is_first(), outcome.team()) {
            let text = format!(
                "🔥 Команда «{}» жмёт первой! Отметь результат кнопками ниже.",
                escape_html(&team.name)
            );
            let keyboard = keyboards::admin_answer(team.id);
            self.send_logged(game.owner_user_id, &text, Some(&keyboard))
                .await;
            self.notify_team(team.id, "Вы первые! 📣 Сообщите ведущему, что готовы отвечать.")
                .await?;
        }
        Ok(())
    }

    // =========================================================================
    // Admin panel
    // =========================================================================

    async fn on_admin_start_game(&self, press: &Press<'_>) -> Result<(), BotError> {
        let store = self.store();
        let mut game = self.take_over_game(press.user.id).await?;
        self.game.start_game(&mut game).await?;

        let without_team: HashSet<i64> = store
            .players_without_team()
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        let (idle, ready): (Vec<_>, Vec<_>) = store
            .all_players()
            .await?
            .into_iter()
            .partition(|p| without_team.contains(&p.id));

        log::info!(
            "Game {} started by {} ({} ready, {} without team)",
            game.id,
            press.user.id,
            ready.len(),
            idle.len()
        );

        self.answer(press, "Игра запущена.", false).await?;
        self.edit_origin(
            press,
            "Игра запущена 🚀\nКак только будешь готов — нажми «Запустить вопрос».",
            Some(GameStatus::Running),
        )
        .await;

        self.broadcast(
            &ready,
            "Игра стартовала! ⚡ Совсем скоро будет первый вопрос.",
            Some(&keyboards::player_menu(true, false)),
        )
        .await;
        self.broadcast(
            &idle,
            "Игра стартовала, но у тебя ещё нет команды. 🆕 Зарегистрируй её через кнопку в меню.",
            Some(&keyboards::player_menu(false, false)),
        )
        .await;
        Ok(())
    }

    async fn on_admin_start_question(&self, press: &Press<'_>) -> Result<(), BotError> {
        let store = self.store();
        let Some(mut game) = store
            .active_game()
            .await?
            .filter(|g| g.status != GameStatus::Finished)
        else {
            return self.answer(press, NO_ACTIVE_GAME, true).await;
        };

        self.game.start_question(&mut game).await?;

        let without_team: HashSet<i64> = store
            .players_without_team()
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        let ready: Vec<_> = store
            .all_players()
            .await?
            .into_iter()
            .filter(|p| !without_team.contains(&p.id))
            .collect();

        self.answer(press, "Вопрос запущен.", false).await?;
        self.edit_origin(
            press,
            "Вопрос активирован ❓\nЖду нажатий на «БАЗЗЕР».",
            Some(GameStatus::Question),
        )
        .await;

        self.broadcast(
            &ready,
            "❓ Новый вопрос! Кто первый нажмёт «БАЗЗЕР», тот отвечает.",
            Some(&keyboards::player_menu(true, true)),
        )
        .await;
        Ok(())
    }

    async fn on_admin_finish_game(&self, press: &Press<'_>) -> Result<(), BotError> {
        let store = self.store();
        let Some(mut game) = store.active_game().await? else {
            return self.answer(press, "Игра уже завершена.", true).await;
        };

        self.game.finish_game(&mut game).await?;
        let scores = self.game.scores(&game).await?;
        let players = store.all_players().await?;
        log::info!("Game {} finished by {}", game.id, press.user.id);

        self.answer(press, "Игра завершена.", false).await?;
        self.edit_origin(
            press,
            "Игра завершена 🎉 Спасибо за раунд!",
            Some(GameStatus::Finished),
        )
        .await;

        let table = score_table(&scores, "Таблица пустая.");
        self.messenger
            .send_message(press.user.id, &format!("🏁 Итоги игры:\n{}", table), None)
            .await?;
        self.broadcast(&players, &format!("🏁 Игра завершена! Итоги:\n{}", table), None)
            .await;
        Ok(())
    }

    async fn on_admin_show_scores(&self, press: &Press<'_>) -> Result<(), BotError> {
        let Some(game) = self.store().active_game().await? else {
            return self.answer(press, NO_ACTIVE_GAME, true).await;
        };
        let scores = self.game.scores(&game).await?;

        self.answer(press, "Показаны актуальные очки.", false).await?;
        let table = score_table(&scores, "Пока нет очков.");
        self.messenger
            .send_message(press.user.id, &format!("📊 Текущие очки:\n{}", table), None)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Answer marking
    // =========================================================================

    async fn on_admin_correct(&self, press: &Press<'_>, team_id: i64) -> Result<(), BotError> {
        let Some(mut game) = self.store().active_game().await? else {
            return self.answer(press, NO_ACTIVE_GAME, true).await;
        };

        let (removed, _) = self.game.pop_queue(&game).await;
        if removed.is_some_and(|id| id != team_id) {
            log::warn!(
                "Game {}: scoring team {} but queue head was {:?}",
                game.id,
                team_id,
                removed
            );
        }
        self.game.award_score(&game, team_id, 1).await?;
        self.game.finish_question(&mut game).await?;
        let scores = self.game.scores(&game).await?;

        self.answer(press, "Баллы начислены.", false).await?;
        self.delete_origin(press).await;

        let table = score_table(&scores, "Пока пусто.");
        let panel = keyboards::admin_panel(Some(GameStatus::Running));
        self.messenger
            .send_message(press.user.id, &format!("📊 Очки обновлены:\n{}", table), Some(&panel))
            .await?;
        self.notify_team(team_id, "✅ Ответ засчитан! Команда получила балл.")
            .await
    }

    async fn on_admin_wrong(&self, press: &Press<'_>) -> Result<(), BotError> {
        let store = self.store();
        let Some(mut game) = store.active_game().await? else {
            return self.answer(press, NO_ACTIVE_GAME, true).await;
        };

        let (removed, rest) = self.game.pop_queue(&game).await;
        let panel = keyboards::admin_panel(Some(GameStatus::Running));

        if rest.is_empty() {
            self.game.finish_question(&mut game).await?;
            let removed_team = match removed {
                Some(id) => store.teams_by_ids(&[id]).await?.remove(&id),
                None => None,
            };

            self.answer(press, "Очередь пуста. Запустите новый вопрос.", false)
                .await?;
            self.delete_origin(press).await;

            let text = match removed_team {
                Some(team) => {
                    self.notify_team(team.id, "Ответ неверный. Подождите следующего вопроса.")
                        .await?;
                    format!(
                        "Команда «{}» ответила неверно. Очередь закончилась.",
                        escape_html(&team.name)
                    )
                }
                None => "Очередь закончилась. Нажми «Запустить вопрос», чтобы начать заново."
                    .to_string(),
            };
            self.messenger
                .send_message(press.user.id, &text, Some(&panel))
                .await?;
            return Ok(());
        }

        self.answer(press, "Переходим к следующей команде.", false)
            .await?;
        self.delete_origin(press).await;

        let ids: Vec<i64> = removed.into_iter().chain(rest.iter().copied()).collect();
        let teams = store.teams_by_ids(&ids).await?;

        if let Some(team) = removed.and_then(|id| teams.get(&id)) {
            self.notify_team(team.id, "Ответ неверный. Ждите следующего вопроса.")
                .await?;
        }

        let next_id = rest[0];
        if let Some(next) = teams.get(&next_id) {
            self.notify_team(next.id, "Предыдущая команда ответила неверно. Вы на очереди!")
                .await?;

            let names: Vec<String> = rest
                .iter()
                .filter_map(|id| teams.get(id))
                .map(|team| escape_html(&team.name))
                .collect();
            let (_, waiting) = head_and_tail(&names);
            let text = format!(
                "Теперь отвечает команда «{}».\nДальше в очереди: {}",
                escape_html(&next.name),
                waiting
            );
            self.messenger
                .send_message(press.user.id, &text, Some(&keyboards::admin_answer(next_id)))
                .await?;
        }
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn answer(&self, press: &Press<'_>, text: &str, show_alert: bool) -> Result<(), BotError> {
        self.messenger
            .answer_callback(press.id, text, show_alert)
            .await?;
        Ok(())
    }

    /// Rewrites the admin panel message the button was pressed on.
    async fn edit_origin(&self, press: &Press<'_>, text: &str, status: Option<GameStatus>) {
        let Some(origin) = press.origin else {
            return;
        };
        let panel = keyboards::admin_panel(status);
        if let Err(err) = self
            .messenger
            .edit_message(origin.chat_id, origin.message_id, text, Some(&panel))
            .await
        {
            log::warn!("Failed to update admin panel: {}", err);
        }
    }

    /// Removes the message the button was pressed on.
    async fn delete_origin(&self, press: &Press<'_>) {
        let Some(origin) = press.origin else {
            return;
        };
        if let Err(err) = self
            .messenger
            .delete_message(origin.chat_id, origin.message_id)
            .await
        {
            log::debug!("Could not delete message {}: {}", origin.message_id, err);
        }
    }
}
