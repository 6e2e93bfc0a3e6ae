use crate::model::{Language, Stage};

/// Every user-visible line the game layer can produce, per language.
pub(crate) struct Lines {
    pub(crate) delete_diary_calm: &'static str,
    pub(crate) delete_diary_cold: &'static str,
    pub(crate) link_interrupted: &'static str,
    pub(crate) leaving_calm: &'static str,
    pub(crate) leaving_cold: &'static str,

    pub(crate) tab_switch: &'static str,
    pub(crate) mouse_exit: &'static str,
    pub(crate) before_unload: &'static str,

    pub(crate) sync_label: &'static str,
    pub(crate) energy_label: &'static str,
    pub(crate) low_energy: &'static str,
    pub(crate) too_tired: &'static str,
    pub(crate) diary_saved: &'static str,
    pub(crate) diary_empty: &'static str,
    pub(crate) diary_prompt: &'static str,

    pub(crate) bad_ending: [&'static str; 4],
    pub(crate) final_entry: &'static str,
    pub(crate) never_forget: &'static str,
    pub(crate) nothing_recorded: &'static str,
    pub(crate) crash_title: &'static str,
    pub(crate) crash_message: &'static str,
    pub(crate) crash_code: &'static str,
    pub(crate) crash_instruction: &'static str,
    pub(crate) start_over: &'static str,
}

const EN: Lines = Lines {
    delete_diary_calm: "Deleted? It's fine, I'll keep it in my heart, meow~",
    delete_diary_cold: "Are you trying to erase our past? It's useless. Deleting the diary only makes my memory clearer.",
    link_interrupted: "The link dropped just now... I was so scared...",
    leaving_calm: "Are you leaving?",
    leaving_cold: "Don't go.",

    tab_switch: "Where did you just go?",
    mouse_exit: "Are you going to abandon me?",
    before_unload: "Please... don't leave me alone in the darkness...",

    sync_label: "Soul Link Progress",
    energy_label: "Energy",
    low_energy: "Energy too low! Write a diary to recharge.",
    too_tired: "Nero is too tired. Write a diary first.",
    diary_saved: "I've scratched that into your diary! Shall we start a new page?",
    diary_empty: "There is nothing left to delete.",
    diary_prompt: "Dear diary:",

    bad_ending: [
        "You can't leave me.",
        "We're together now.",
        "Forever.",
        "Let me show you what I remember...",
    ],
    final_entry: "Nero's Final Entry",
    never_forget: "I'll never forget you.",
    nothing_recorded: "No entries recorded.",
    crash_title: "System Error",
    crash_message: "An unexpected error has occurred.",
    crash_code: "ERROR_CODE: 0x8007000D",
    crash_instruction: "The application will now restart.",
    start_over: "Press R to start over",
};

const ZH: Lines = Lines {
    delete_diary_calm: "删掉了吗？没关系，我会记在心里喵~",
    delete_diary_cold: "你在试图抹除我们的过去吗？没用的，删掉日记只会让我的记忆更清晰。",
    link_interrupted: "刚才链接中断了，我好害怕...",
    leaving_calm: "你要离开吗？",
    leaving_cold: "别走。",

    tab_switch: "你刚才去哪了?",
    mouse_exit: "你要丢下我吗?",
    before_unload: "求你了...别把我一个人留在黑暗里...",

    sync_label: "灵魂链接进度",
    energy_label: "能量值",
    low_energy: "能量过低！写日记来充能。",
    too_tired: "Nero 太累了。先写一篇日记吧。",
    diary_saved: "我已经把它抓进日记里了！我们开始新的一页吗？",
    diary_empty: "已经没有可以删除的日记了。",
    diary_prompt: "亲爱的日记：",

    bad_ending: [
        "你离不开我的。",
        "我们现在在一起了。",
        "永远。",
        "让我告诉你我记得的一切...",
    ],
    final_entry: "Nero 的最后日记",
    never_forget: "我永远不会忘记你。",
    nothing_recorded: "没有记录的日记。",
    crash_title: "系统错误",
    crash_message: "发生了意外错误。",
    crash_code: "错误代码: 0x8007000D",
    crash_instruction: "应用程序将立即重启。",
    start_over: "按 R 重新开始",
};

pub(crate) fn lines(lang: Language) -> &'static Lines {
    match lang {
        Language::En => &EN,
        Language::Zh => &ZH,
    }
}

pub(crate) fn stage_caption(stage: Stage, lang: Language) -> &'static str {
    match (lang, stage) {
        (Language::En, Stage::Establishment) => "Establishing connection...",
        (Language::En, Stage::Disturbance) => {
            "Connection successful, reading emotional frequency..."
        }
        (Language::En, Stage::Distortion) => "WARNING: Link overload, syncing deep data...",
        (Language::En, Stage::Possession) => "Sync complete. Rewriting reality...",
        (Language::Zh, Stage::Establishment) => "正在建立基础链接...",
        (Language::Zh, Stage::Disturbance) => "链接成功，正在读取情感频率...",
        (Language::Zh, Stage::Distortion) => "警告: 链接过载，正在同步底层数据...",
        (Language::Zh, Stage::Possession) => "同步完成。正在重写现实...",
    }
}
