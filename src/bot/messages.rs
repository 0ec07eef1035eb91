//! User-facing texts and their rendering: result lists, recipes, ingredient pages.

use crate::model::{Cocktail, CocktailDetail};
use crate::telegram::{InlineButton, InlineKeyboard};

pub const WELCOME: &str = "Привет! Я бот для поиска коктейлей. Просто отправь мне название ингредиента (например, 'водка'), и я найду коктейли, в которых он есть.\n\nТы также можешь искать по нескольким ингредиентам, перечислив их через запятую (например, 'ром, мята, лайм').";
pub const UNKNOWN: &str = "Не понимаю вас 😟, напишите /start";
pub const NOT_FOUND: &str = "К сожалению, по вашему запросу ничего не найдено. Попробуйте другие ингредиенты.";
pub const SEARCH_PROMPT: &str = "Напишите ингредиент после команды, например: /search водка. Можно просто отправить название ингредиента сообщением.";
pub const SEARCH_FIRST: &str = "Сначала выполните поиск, чтобы я мог показать вам рецепт. Введите ингредиент.";
pub const CHOOSE_FROM_LIST: &str = "Пожалуйста, выберите номер из списка.";
pub const DETAILS_FAILED: &str = "Не удалось получить детали рецепта. Попробуйте еще раз.";
pub const INGREDIENTS_UNAVAILABLE: &str = "Не удалось получить список ингредиентов.";
pub const INVALID_NUMBERS: &str = "Некорректные номера. Попробуйте еще раз, вы все еще в режиме выбора ингредиентов.";
pub const NO_COMBINATION: &str = "Коктейли с таким сочетанием ингредиентов не найдены. Вы можете попробовать другие номера.";
pub const NUMBERS_EXPECTED: &str = "Пожалуйста, введите номера ингредиентов в виде чисел, например: 5 или 7, 12, 23. Вы все еще в режиме выбора ингредиентов.";
pub const PAGE_HINT: &str = "Отправьте номера ингредиентов через запятую (например: 5 или 7, 12, 23), чтобы найти коктейли с ними.";

const RESULTS_HEADER: &str = "Вот что я нашел:";
const RESULTS_FOOTER: &str = "Отправьте номер, чтобы получить рецепт.";
const BACK_LABEL: &str = "⬅️ Назад";
const NEXT_LABEL: &str = "Вперед ➡️";

/// Ingredients shown per page.
pub const PAGE_SIZE: usize = 20;
/// Callback data of paging buttons: the prefix followed by the 0-based page index.
pub const PAGE_CALLBACK_PREFIX: &str = "/ingredients_";

/// 1-based numbered list of search results.
pub fn result_list(cocktails: &[Cocktail]) -> String {
    let mut text = String::from(RESULTS_HEADER);
    for (i, cocktail) in cocktails.iter().enumerate() {
        text.push('\n');
        text.push_str(&format!("{}. {}", i + 1, cocktail.name));
    }
    text.push_str("\n\n");
    text.push_str(RESULTS_FOOTER);
    text
}

pub fn recipe(detail: &CocktailDetail) -> String {
    format!(
        "Название: {}\n\nИнгредиенты:\n{}\n\nИнструкция:\n{}",
        detail.name,
        detail.ingredients.join("\n"),
        detail.instructions.as_deref().unwrap_or_default()
    )
}

/// Number of pages needed for `total` ingredients; an empty list still has one page.
pub fn page_count(total: usize) -> usize {
    total.div_ceil(PAGE_SIZE).max(1)
}

/// Clamp a requested page to the last existing page.
pub fn clamp_page(page: usize, total: usize) -> usize {
    page.min(page_count(total) - 1)
}

/// One page of the ingredient catalog, numbered globally across pages.
pub fn ingredients_page(ingredients: &[String], page: usize) -> String {
    let start = (page * PAGE_SIZE).min(ingredients.len());
    let end = (start + PAGE_SIZE).min(ingredients.len());
    let lines: Vec<String> = ingredients[start..end]
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {}", start + i + 1, name))
        .collect();

    let mut text = format!("Доступные ингредиенты (страница {}):\n{}", page + 1, lines.join("\n"));
    if page == 0 {
        text.push_str("\n\n");
        text.push_str(PAGE_HINT);
    }
    text
}

/// Back/next buttons for a page, or `None` when everything fits on one page.
pub fn page_keyboard(page: usize, total: usize) -> Option<InlineKeyboard> {
    let mut row = Vec::with_capacity(2);
    if page > 0 {
        row.push(InlineButton::new(BACK_LABEL, page_callback(page - 1)));
    }
    if (page + 1) * PAGE_SIZE < total {
        row.push(InlineButton::new(NEXT_LABEL, page_callback(page + 1)));
    }
    if row.is_empty() {
        None
    } else {
        Some(InlineKeyboard::row(row))
    }
}

pub fn page_callback(page: usize) -> String {
    format!("{PAGE_CALLBACK_PREFIX}{page}")
}

/// Page index carried by a paging callback, `None` if it is not a valid page number.
pub fn parse_page_callback(data: &str) -> Option<usize> {
    data.strip_prefix(PAGE_CALLBACK_PREFIX)?.trim().parse().ok()
}

/// Split `text` into chunks of at most `max_chars` characters, preferring line breaks.
/// A single line longer than the limit is cut at character boundaries.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for line in text.split('\n') {
        let line_len = line.chars().count();
        let sep = usize::from(!current.is_empty());
        if current_len + sep + line_len <= max_chars {
            if sep == 1 {
                current.push('\n');
            }
            current.push_str(line);
            current_len += sep + line_len;
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len <= max_chars {
            current.push_str(line);
            current_len = line_len;
            continue;
        }
        let chars: Vec<char> = line.chars().collect();
        for piece in chars.chunks(max_chars) {
            chunks.push(piece.iter().collect());
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
