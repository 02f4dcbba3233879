//! Inline button handlers.

mod common;

use common::ADMIN_ID;
use common::Harness;
use common::PANEL_MESSAGE_ID;
use quizbot_lib::store::GameStatus;

#[tokio::test]
async fn test_player_register_sets_pending() {
    let h = Harness::new().await;
    h.press(999, "player_register").await;

    assert!(h.bot.pending().is_pending(999));
    let prompt = h.messenger.messages_to(999).pop().unwrap();
    assert!(prompt.text.starts_with("Введи название"));
    assert!(!h.messenger.last_answer().alert);
}

#[tokio::test]
async fn test_admin_buttons_require_admin() {
    let h = Harness::new().await;
    for data in [
        "admin_start_game",
        "admin_start_question",
        "admin_finish_game",
        "admin_show_scores",
        "admin_correct:1",
        "admin_correct:oops",
        "admin_wrong",
    ] {
        h.press(500, data).await;
        let answer = h.messenger.last_answer();
        assert_eq!(answer.text, "Недостаточно прав.");
        assert!(answer.alert);
    }
    assert!(h.active_game().await.is_none());
    assert!(h.messenger.messages().is_empty());
}

#[tokio::test]
async fn test_malformed_team_id() {
    let h = Harness::new().await;
    h.running_game().await;
    h.press(ADMIN_ID, "admin_correct:abc").await;

    let answer = h.messenger.last_answer();
    assert_eq!(answer.text, "Некорректные данные.");
    assert!(answer.alert);
}

#[tokio::test]
async fn test_unknown_payload_is_acknowledged() {
    let h = Harness::new().await;
    h.press(500, "buzzer_press").await;
    let answer = h.messenger.last_answer();
    assert!(answer.text.is_empty());
    assert!(!answer.alert);
}

#[tokio::test]
async fn test_admin_start_game_broadcasts() {
    let h = Harness::new().await;
    h.player_with_team(101, "Comets").await;
    h.player(202, "Without").await;

    h.press(ADMIN_ID, "admin_start_game").await;

    let game = h.active_game().await.unwrap();
    assert_eq!(game.status, GameStatus::Running);
    assert_eq!(game.owner_user_id, ADMIN_ID);

    assert_eq!(h.messenger.recipients(), [101, 202].into_iter().collect());
    let ready = h.messenger.messages_to(101).pop().unwrap();
    assert_eq!(ready.callbacks(), vec!["player_buzzer"]);
    let idle = h.messenger.messages_to(202).pop().unwrap();
    assert_eq!(idle.callbacks(), vec!["player_register"]);

    let panel = h.messenger.edits().pop().unwrap();
    assert_eq!(panel.callbacks()[0], "admin_start_question");
    assert_eq!(h.messenger.last_answer().text, "Игра запущена.");
}

#[tokio::test]
async fn test_broadcast_skips_blocked_players() {
    let h = Harness::new().await;
    h.player_with_team(101, "Comets").await;
    h.player_with_team(102, "Meteors").await;
    h.messenger.block(101);

    h.press(ADMIN_ID, "admin_start_game").await;

    assert_eq!(h.messenger.recipients(), [102].into_iter().collect());
    assert_eq!(h.active_game().await.unwrap().status, GameStatus::Running);
}

#[tokio::test]
async fn test_admin_start_question_pushes_buzzer() {
    let h = Harness::new().await;
    h.player_with_team(505, "Delta").await;
    h.player(506, "Nobody").await;
    h.running_game().await;

    h.press(ADMIN_ID, "admin_start_question").await;

    assert_eq!(h.messenger.last_answer().text, "Вопрос запущен.");
    let push = h.messenger.messages_to(505).pop().unwrap();
    assert!(push.text.contains("Новый вопрос"));
    assert!(h.messenger.messages_to(506).is_empty());
    assert_eq!(h.active_game().await.unwrap().status, GameStatus::Question);

    let panel = h.messenger.edits().pop().unwrap();
    assert_eq!(panel.callbacks(), vec!["admin_show_scores", "admin_finish_game"]);
}

#[tokio::test]
async fn test_admin_start_question_without_game() {
    let h = Harness::new().await;
    h.press(ADMIN_ID, "admin_start_question").await;
    let answer = h.messenger.last_answer();
    assert_eq!(answer.text, "Нет активной игры.");
    assert!(answer.alert);
}

#[tokio::test]
async fn test_player_buzzer_notifies_admin() {
    let h = Harness::new().await;
    h.player_with_team(303, "Alpha").await;
    h.question_game().await;

    h.press(303, "player_buzzer").await;

    assert!(h.messenger.last_answer().text.starts_with("Вы первые"));
    let to_admin = h.messenger.messages_to(ADMIN_ID).pop().unwrap();
    assert!(to_admin.text.contains("Alpha"));
    assert_eq!(to_admin.callbacks()[1], "admin_wrong");
    assert!(to_admin.callbacks()[0].starts_with("admin_correct:"));
    assert!(!h.messenger.messages_to(303).is_empty());
}

#[tokio::test]
async fn test_second_buzz_does_not_notify_admin() {
    let h = Harness::new().await;
    h.player_with_team(303, "Alpha").await;
    h.player_with_team(304, "Beta").await;
    h.question_game().await;

    h.press(303, "player_buzzer").await;
    h.press(304, "player_buzzer").await;
    h.press(303, "player_buzzer").await;

    assert_eq!(h.messenger.messages_to(ADMIN_ID).len(), 1);
    let answers = h.messenger.answers();
    assert!(answers[1].text.contains("№2"));
    assert!(answers[2].text.contains("уже в очереди"));
}

#[tokio::test]
async fn test_player_buzzer_without_game() {
    let h = Harness::new().await;
    h.press(9999, "player_buzzer").await;
    let answer = h.messenger.last_answer();
    assert!(answer.alert);
    assert!(answer.text.to_lowercase().contains("нет активной игры"));
}

#[tokio::test]
async fn test_player_buzzer_without_team() {
    let h = Harness::new().await;
    h.question_game().await;
    h.press(5555, "player_buzzer").await;
    assert!(h.messenger.last_answer().text.contains("без команды"));
}

#[tokio::test]
async fn test_admin_correct_awards_score() {
    let h = Harness::new().await;
    let (bravo, team) = h.player_with_team(404, "Bravo").await;
    let game = h.question_game().await;
    h.game().press_buzzer(&game, &bravo).await.unwrap();

    h.press(ADMIN_ID, &format!("admin_correct:{}", team.id)).await;

    assert_eq!(h.messenger.last_answer().text, "Баллы начислены.");
    assert_eq!(
        h.game().scores(&game).await.unwrap(),
        vec![("Bravo".to_string(), 1)]
    );
    let active = h.active_game().await.unwrap();
    assert_eq!(active.status, GameStatus::Running);
    assert!(h.game().current_queue(&game).await.is_empty());

    let table = h.messenger.messages_to(ADMIN_ID).pop().unwrap();
    assert!(table.text.contains("1. Bravo — 1"));
    assert_eq!(table.callbacks()[0], "admin_start_question");
    assert_eq!(h.messenger.deletes(), vec![(ADMIN_ID, PANEL_MESSAGE_ID)]);
    assert!(h.messenger.messages_to(404)[0].text.contains("засчитан"));
}

#[tokio::test]
async fn test_admin_show_scores() {
    let h = Harness::new().await;
    let (_, team) = h.player_with_team(707, "Foxtrot").await;
    let game = h.running_game().await;
    h.game().award_score(&game, team.id, 1).await.unwrap();

    h.press(ADMIN_ID, "admin_show_scores").await;

    let table = h.messenger.messages_to(ADMIN_ID).pop().unwrap();
    assert!(table.text.starts_with("📊 Текущие очки:"));
    assert!(table.text.contains("Foxtrot"));
}

#[tokio::test]
async fn test_admin_show_scores_empty_table() {
    let h = Harness::new().await;
    h.running_game().await;
    h.press(ADMIN_ID, "admin_show_scores").await;
    let table = h.messenger.messages_to(ADMIN_ID).pop().unwrap();
    assert!(table.text.contains("Пока нет очков."));
}

#[tokio::test]
async fn test_admin_finish_game_sends_scores() {
    let h = Harness::new().await;
    let (echo, team) = h.player_with_team(606, "Echo").await;
    let mut game = h.question_game().await;
    h.game().press_buzzer(&game, &echo).await.unwrap();
    h.game().award_score(&game, team.id, 1).await.unwrap();
    h.game().finish_question(&mut game).await.unwrap();

    h.press(ADMIN_ID, "admin_finish_game").await;

    assert!(h.active_game().await.is_none());
    let summary = h.messenger.messages_to(ADMIN_ID).pop().unwrap();
    assert!(summary.text.contains("Итоги игры"));
    assert!(summary.text.contains("1. Echo — 1"));
    let broadcast = h.messenger.messages_to(606).pop().unwrap();
    assert!(broadcast.text.contains("Игра завершена"));

    let panel = h.messenger.edits().pop().unwrap();
    assert_eq!(panel.callbacks(), vec!["admin_start_game"]);
}

#[tokio::test]
async fn test_admin_finish_game_twice() {
    let h = Harness::new().await;
    h.press(ADMIN_ID, "admin_finish_game").await;
    let answer = h.messenger.last_answer();
    assert_eq!(answer.text, "Игра уже завершена.");
    assert!(answer.alert);
}

#[tokio::test]
async fn test_admin_wrong_empty_queue() {
    let h = Harness::new().await;
    h.question_game().await;

    h.press(ADMIN_ID, "admin_wrong").await;

    let notice = h.messenger.messages_to(ADMIN_ID).pop().unwrap();
    assert!(notice.text.contains("Очередь закончилась"));
    assert_eq!(notice.callbacks()[0], "admin_start_question");
    assert_eq!(h.active_game().await.unwrap().status, GameStatus::Running);
}

#[tokio::test]
async fn test_admin_wrong_last_team() {
    let h = Harness::new().await;
    let (solo, _) = h.player_with_team(810, "Solo").await;
    let game = h.question_game().await;
    h.game().press_buzzer(&game, &solo).await.unwrap();

    h.press(ADMIN_ID, "admin_wrong").await;

    assert!(h.messenger.messages_to(810)[0].text.contains("неверный"));
    let notice = h.messenger.messages_to(ADMIN_ID).pop().unwrap();
    assert!(notice.text.contains("«Solo» ответила неверно"));
    assert_eq!(h.active_game().await.unwrap().status, GameStatus::Running);
}

#[tokio::test]
async fn test_admin_wrong_moves_queue() {
    let h = Harness::new().await;
    let (p1, _) = h.player_with_team(808, "Team1").await;
    let (p2, team2) = h.player_with_team(809, "Team2").await;
    let (p3, _) = h.player_with_team(807, "Team3").await;
    let game = h.question_game().await;
    for player in [&p1, &p2, &p3] {
        h.game().press_buzzer(&game, player).await.unwrap();
    }

    h.press(ADMIN_ID, "admin_wrong").await;

    assert!(h.messenger.messages_to(808)[0].text.contains("невер"));
    assert!(h.messenger.messages_to(809)[0].text.contains("Вы на очереди"));

    let next = h.messenger.messages_to(ADMIN_ID).pop().unwrap();
    assert!(next.text.contains("«Team2»"));
    assert!(next.text.contains("Дальше в очереди: Team3"));
    assert_eq!(next.callbacks()[0], format!("admin_correct:{}", team2.id));
    assert_eq!(h.game().current_queue(&game).await.len(), 2);
    assert_eq!(h.active_game().await.unwrap().status, GameStatus::Question);
}
