/// Pull a bare video id out of whatever the user pasted: a raw id, a
/// watch URL, a short youtu.be link, or a shorts link.
pub fn extract_video_id(input: &str) -> String {
    let input = input.trim();
    if input.contains("youtube.com") || input.contains("youtu.be") {
        if let Some(rest) = input.split("v=").nth(1) {
            return rest.split('&').next().unwrap_or(rest).to_string();
        }
        if let Some(rest) = input.split("youtu.be/").nth(1) {
            return rest.split('?').next().unwrap_or(rest).to_string();
        }
        if let Some(rest) = input.split("/shorts/").nth(1) {
            return rest.split('?').next().unwrap_or(rest).to_string();
        }
    }
    input.to_string()
}
